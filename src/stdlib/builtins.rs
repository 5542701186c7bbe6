//! Built-in Functions Registry
//!
//! Runtime intrinsics visible in the outermost scope of every program.
//! They take no static link, so a call passes exactly the declared
//! parameters.

use crate::types::{FunctionSig, Type};

/// Built-in function signature
#[derive(Debug, Clone)]
pub struct BuiltinFunc {
    pub name: &'static str,
    pub params: Vec<Type>,
    pub ret_type: Type,
    /// Runtime symbol the code generator calls
    pub symbol: &'static str,
}

impl BuiltinFunc {
    pub fn sig(&self) -> FunctionSig {
        FunctionSig { params: self.params.clone(), ret: self.ret_type }
    }
}

/// Registry of all built-in functions, in registration order
pub struct BuiltinRegistry {
    functions: Vec<BuiltinFunc>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let mut registry = Self { functions: Vec::new() };
        registry.register_all();
        registry
    }

    fn register_all(&mut self) {
        use Type::{Int, String, Void};

        // I/O
        self.register("print", vec![String], Void, "print");
        self.register("printd", vec![Int], Void, "printd");
        self.register("flush", vec![], Void, "flush");
        self.register("getchar", vec![], String, "getchar_");

        // Strings
        self.register("ord", vec![String], Int, "ord");
        self.register("chr", vec![Int], String, "chr");
        self.register("size", vec![String], Int, "size");
        self.register("substring", vec![String, Int, Int], String, "substring");
        self.register("concat", vec![String, String], String, "concat");

        // Misc
        self.register("not", vec![Int], Int, "not_");
        self.register("exit", vec![Int], Void, "exit_");
    }

    fn register(&mut self, name: &'static str, params: Vec<Type>, ret_type: Type, symbol: &'static str) {
        self.functions.push(BuiltinFunc { name, params, ret_type, symbol });
    }

    pub fn get(&self, name: &str) -> Option<&BuiltinFunc> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuiltinFunc> {
        self.functions.iter()
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}
