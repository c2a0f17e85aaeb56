// cvar.rs: console variables, the configuration layer

use std::collections::HashMap;

use bitflags::bitflags;
use parking_lot::RwLock;
use thiserror::Error;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CvarFlags: u32 {
        /// Saved by `write_variables`.
        const ARCHIVE = 0x01;
        /// Read-only once registered.
        const NOSET   = 0x02;
        /// New values are held until `get_latched_vars`.
        const LATCH   = 0x04;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CvarError {
    #[error("{0} is write protected")]
    WriteProtected(String),
    #[error("bad command line near \"{0}\": expected +set <variable> <value>")]
    BadCommandLine(String),
}

/// A console variable.
#[derive(Clone, Debug)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub latched_string: Option<String>,
    pub flags: CvarFlags,
    pub modified: bool,
    pub value: f32,
}

fn parse_value(s: &str) -> f32 {
    s.trim().parse::<f32>().unwrap_or(0.0)
}

/// The full cvar system context.
#[derive(Default)]
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    /// O(1) cvar lookup by name -> index in cvar_vars
    cvar_index: HashMap<String, usize>,
}

impl CvarContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    fn find_var_mut(&mut self, name: &str) -> Option<&mut Cvar> {
        match self.cvar_index.get(name) {
            Some(&idx) => Some(&mut self.cvar_vars[idx]),
            None => None,
        }
    }

    /// Get the floating-point value of a cvar. Returns 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |var| var.value)
    }

    /// Get or create a cvar. If it already exists the value is not changed,
    /// but flags are OR'd in.
    pub fn get(&mut self, name: &str, value: &str, flags: CvarFlags) -> usize {
        if let Some(&idx) = self.cvar_index.get(name) {
            self.cvar_vars[idx].flags |= flags;
            return idx;
        }

        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar {
            name: name.to_string(),
            string: value.to_string(),
            latched_string: None,
            flags,
            modified: true,
            value: parse_value(value),
        });
        self.cvar_index.insert(name.to_string(), idx);
        idx
    }

    /// Set a cvar value (respects NOSET and LATCH). Unknown names are created.
    pub fn set(&mut self, name: &str, value: &str) -> Result<usize, CvarError> {
        let idx = match self.cvar_index.get(name) {
            Some(&idx) => idx,
            None => return Ok(self.get(name, value, CvarFlags::empty())),
        };
        let var = &mut self.cvar_vars[idx];

        if var.flags.contains(CvarFlags::NOSET) {
            return Err(CvarError::WriteProtected(name.to_string()));
        }

        if var.flags.contains(CvarFlags::LATCH) {
            if var.latched_string.as_deref() == Some(value)
                || (var.latched_string.is_none() && value == var.string)
            {
                return Ok(idx);
            }
            var.latched_string = Some(value.to_string());
            return Ok(idx);
        }

        if value == var.string {
            return Ok(idx); // not changed
        }

        var.modified = true;
        var.string = value.to_string();
        var.value = parse_value(value);
        Ok(idx)
    }

    pub fn is_modified(&self, name: &str) -> bool {
        self.find_var(name).is_some_and(|v| v.modified)
    }

    pub fn clear_modified(&mut self, name: &str) {
        if let Some(var) = self.find_var_mut(name) {
            var.modified = false;
        }
    }

    /// Apply all latched variable changes.
    pub fn get_latched_vars(&mut self) {
        for var in &mut self.cvar_vars {
            if let Some(latched) = var.latched_string.take() {
                if latched != var.string {
                    var.modified = true;
                }
                var.value = parse_value(&latched);
                var.string = latched;
            }
        }
    }

    /// Apply `+set <name> <value>` sequences from the process command line.
    /// Tokens outside a `+set` group are rejected.
    pub fn apply_command_line<S: AsRef<str>>(&mut self, args: &[S]) -> Result<(), CvarError> {
        let mut i = 0;
        while i < args.len() {
            let token = args[i].as_ref();
            if token != "+set" {
                return Err(CvarError::BadCommandLine(token.to_string()));
            }
            let (Some(name), Some(value)) = (args.get(i + 1), args.get(i + 2)) else {
                return Err(CvarError::BadCommandLine(token.to_string()));
            };
            self.set(name.as_ref(), value.as_ref())?;
            i += 3;
        }
        Ok(())
    }

    /// Write all archived cvars to a writer.
    pub fn write_variables(&self, writer: &mut dyn std::io::Write) -> std::io::Result<()> {
        for var in &self.cvar_vars {
            if var.flags.contains(CvarFlags::ARCHIVE) {
                writeln!(writer, "set {} \"{}\"", var.name, var.string)?;
            }
        }
        Ok(())
    }
}

// ============================================================
// Global singleton and free-function wrappers
// ============================================================

static CVAR_CTX: RwLock<Option<CvarContext>> = parking_lot::const_rwlock(None);

/// Access the global context with a closure, creating it on first use.
pub fn with_cvar_ctx<F, R>(f: F) -> R
where
    F: FnOnce(&mut CvarContext) -> R,
{
    let mut g = CVAR_CTX.write();
    f(g.get_or_insert_with(CvarContext::new))
}

pub fn cvar_get(name: &str, value: &str, flags: CvarFlags) -> usize {
    with_cvar_ctx(|c| c.get(name, value, flags))
}

pub fn cvar_variable_value(name: &str) -> f32 {
    CVAR_CTX.read().as_ref().map_or(0.0, |c| c.variable_value(name))
}

pub fn cvar_get_latched_vars() {
    with_cvar_ctx(|c| c.get_latched_vars());
}

pub fn cvar_apply_command_line<S: AsRef<str>>(args: &[S]) -> Result<(), CvarError> {
    with_cvar_ctx(|c| c.apply_command_line(args))
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cvar_get_and_find() {
        let mut ctx = CvarContext::new();
        ctx.get("g_speed", "320", CvarFlags::empty());
        assert_eq!(ctx.variable_value("g_speed"), 320.0);
        assert_eq!(ctx.find_var("g_speed").unwrap().string, "320");
    }

    #[test]
    fn test_cvar_get_creates_once() {
        let mut ctx = CvarContext::new();
        ctx.get("test", "1", CvarFlags::empty());
        ctx.get("test", "2", CvarFlags::ARCHIVE); // should NOT change value
        assert_eq!(ctx.find_var("test").unwrap().string, "1");
        assert!(ctx.find_var("test").unwrap().flags.contains(CvarFlags::ARCHIVE));
    }

    #[test]
    fn test_cvar_set() {
        let mut ctx = CvarContext::new();
        ctx.get("g_gravity", "800", CvarFlags::empty());
        ctx.clear_modified("g_gravity");
        ctx.set("g_gravity", "400").unwrap();
        assert_eq!(ctx.variable_value("g_gravity"), 400.0);
        assert!(ctx.is_modified("g_gravity"));
    }

    #[test]
    fn test_cvar_set_same_value_is_not_a_modification() {
        let mut ctx = CvarContext::new();
        ctx.get("g_gravity", "800", CvarFlags::empty());
        ctx.clear_modified("g_gravity");
        ctx.set("g_gravity", "800").unwrap();
        assert!(!ctx.is_modified("g_gravity"));
    }

    #[test]
    fn test_cvar_noset() {
        let mut ctx = CvarContext::new();
        ctx.get("version", "1", CvarFlags::NOSET);
        let err = ctx.set("version", "2").unwrap_err();
        assert_eq!(err, CvarError::WriteProtected("version".into()));
        assert_eq!(err.to_string(), "version is write protected");
        assert_eq!(ctx.variable_value("version"), 1.0);
    }

    #[test]
    fn test_cvar_latch() {
        let mut ctx = CvarContext::new();
        ctx.get("sv_fps", "60", CvarFlags::LATCH);
        ctx.set("sv_fps", "125").unwrap();
        assert_eq!(ctx.variable_value("sv_fps"), 60.0); // not changed yet
        ctx.get_latched_vars();
        assert_eq!(ctx.variable_value("sv_fps"), 125.0);
        assert!(ctx.find_var("sv_fps").unwrap().latched_string.is_none());
    }

    #[test]
    fn test_cvar_not_found() {
        let ctx = CvarContext::new();
        assert_eq!(ctx.variable_value("nonexistent"), 0.0);
        assert!(ctx.find_var("nonexistent").is_none());
        assert!(!ctx.is_modified("nonexistent"));
    }

    #[test]
    fn test_non_numeric_value_reads_as_zero() {
        let mut ctx = CvarContext::new();
        ctx.get("name", "player", CvarFlags::empty());
        assert_eq!(ctx.variable_value("name"), 0.0);
    }

    #[test]
    fn test_apply_command_line() {
        let mut ctx = CvarContext::new();
        ctx.get("g_speed", "320", CvarFlags::empty());
        ctx.apply_command_line(&["+set", "g_speed", "400", "+set", "developer", "1"])
            .unwrap();
        assert_eq!(ctx.variable_value("g_speed"), 400.0);
        assert_eq!(ctx.variable_value("developer"), 1.0);
    }

    #[test]
    fn test_apply_command_line_rejects_stray_tokens() {
        let mut ctx = CvarContext::new();
        assert_eq!(
            ctx.apply_command_line(&["g_speed", "400"]),
            Err(CvarError::BadCommandLine("g_speed".into()))
        );
        assert_eq!(
            ctx.apply_command_line(&["+set", "g_speed"]),
            Err(CvarError::BadCommandLine("+set".into()))
        );
    }

    #[test]
    fn test_apply_command_line_reports_write_protection() {
        let mut ctx = CvarContext::new();
        ctx.get("version", "1", CvarFlags::NOSET);
        assert_eq!(
            ctx.apply_command_line(&["+set", "version", "2"]),
            Err(CvarError::WriteProtected("version".into()))
        );
    }

    #[test]
    fn test_write_variables() {
        let mut ctx = CvarContext::new();
        ctx.get("archived_var", "hello", CvarFlags::ARCHIVE);
        ctx.get("normal_var", "world", CvarFlags::empty());
        let mut buf = Vec::new();
        ctx.write_variables(&mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("set archived_var \"hello\""));
        assert!(!output.contains("normal_var"));
    }
}
