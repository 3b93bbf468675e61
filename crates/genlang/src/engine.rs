//! Compile-and-run pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use genlang_eval::{BuiltinRegistry, EvalResult, Interpreter, Value};
use genlang_parser::{Parser, ParserConfig};
use genlang_types::ast::Program;
use genlang_types::{SourceFile, SyntaxErrors};

use crate::config::GenLangConfig;

/// A parsed, error-free program. Immutable and cheap to clone; one script
/// can be run any number of times, from any thread.
#[derive(Debug, Clone)]
pub struct Script {
    name: String,
    program: Arc<Program>,
}

impl Script {
    /// Parse `source`. Any syntax error rejects the whole script.
    pub fn compile(
        name: &str,
        source: &str,
        config: &ParserConfig,
    ) -> Result<Script, SyntaxErrors> {
        let source_file = SourceFile::new(name, source);
        let result = Parser::with_config(&source_file, *config).parse();
        match result.into_result() {
            Ok(program) => {
                tracing::debug!(
                    script = name,
                    globals = program.globals.len(),
                    functions = program.functions.len(),
                    "compiled script"
                );
                Ok(Script {
                    name: name.to_string(),
                    program: Arc::new(program),
                })
            }
            Err(errors) => {
                tracing::debug!(script = name, errors = errors.total_errors, "script rejected");
                Err(errors)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Names of the script's top-level functions, in source order.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.program
            .functions
            .iter()
            .filter_map(|f| f.name.as_ref().map(|n| n.name.as_str()))
    }
}

/// Holds the configuration and host builtins shared by every script it runs.
#[derive(Debug, Clone)]
pub struct Engine {
    config: GenLangConfig,
    builtins: Arc<BuiltinRegistry>,
}

impl Engine {
    pub fn new(config: GenLangConfig, builtins: BuiltinRegistry) -> Self {
        Self {
            config,
            builtins: Arc::new(builtins),
        }
    }

    pub fn config(&self) -> &GenLangConfig {
        &self.config
    }

    pub fn builtins(&self) -> &Arc<BuiltinRegistry> {
        &self.builtins
    }

    /// Parse `source` with this engine's parser limits.
    pub fn compile(&self, name: &str, source: &str) -> Result<Script, SyntaxErrors> {
        Script::compile(name, source, &self.config.parser)
    }

    /// Call `function` of `script` with parameters bound by name.
    pub fn run(
        &self,
        script: &Script,
        function: &str,
        bindings: &BTreeMap<String, Value>,
    ) -> EvalResult<Value> {
        tracing::debug!(script = script.name(), function, "run");
        self.interpreter(script).run(function, bindings)
    }

    /// An interpreter for `script` sharing this engine's builtins and budget.
    pub fn interpreter(&self, script: &Script) -> Interpreter {
        Interpreter::new(
            Arc::clone(&script.program),
            Arc::clone(&self.builtins),
            self.config.budget,
        )
    }
}

impl Default for Engine {
    /// Default limits with the standard builtins.
    fn default() -> Self {
        Self::new(GenLangConfig::default(), BuiltinRegistry::standard())
    }
}
