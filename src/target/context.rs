use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Everything a translated program reads and writes while it runs.
pub struct RuntimeContext {
    pub vars: HashMap<String, String>,
    pub exports: HashSet<String>,
    pub locals: HashMap<String, String>,
    pub script_path: PathBuf,
    pub shell: String,
    pub out: Box<dyn Write + Send>,
}

impl RuntimeContext {
    /// Seeds the variable map from the process environment, then the
    /// positional parameters: `argv0` is the script, `argv<N>` the arguments.
    pub fn new(script_path: &Path, args: &[String], shell: String) -> Self {
        let vars: HashMap<String, String> = std::env::vars().collect();
        let exports = vars.keys().cloned().collect();
        let mut ctx = Self {
            vars,
            exports,
            locals: HashMap::new(),
            script_path: script_path.to_path_buf(),
            shell,
            out: Box::new(io::stdout()),
        };
        ctx.vars.insert("argv0".to_string(), script_path.display().to_string());
        for (i, arg) in args.iter().enumerate() {
            ctx.vars.insert(format!("argv{}", i + 1), arg.clone());
        }
        ctx
    }

    /// Layers configured variables over the environment; they are exported too.
    pub fn with_env(mut self, env: &HashMap<String, String>) -> Self {
        for (key, value) in env {
            self.vars.insert(key.clone(), value.clone());
            self.exports.insert(key.clone());
        }
        self
    }

    pub fn with_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.out = out;
        self
    }

    /// Environment handed to external commands: the exported variables only.
    pub fn exported_env(&self) -> HashMap<String, String> {
        self.exports
            .iter()
            .filter_map(|k| self.vars.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }
}

/// Cloneable in-memory writer, for collecting program output in tests.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        match self.0.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("output buffer lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
