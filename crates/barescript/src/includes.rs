//! Include resolution for the async interpreter.
//!
//! Each include URL is resolved (system prefix or host URL hook), checked
//! against the per-run deduplication set, fetched, parsed with the URL as
//! its script name, and executed in the same run. URLs are marked included
//! before their bodies execute so a cyclic include resolves cleanly.

use std::rc::Rc;

use crate::{
    error::{ExecResult, RuntimeError},
    execute::Runtime,
    lint::lint_script,
    model::{IncludeEntry, ScriptInfo},
    options::{FetchRequest, UrlFn},
    parse::parse_script,
    url::url_file_relative,
    value::Value,
};

/// Reserved globals key holding the include deduplication set: an object
/// whose keys are the resolved URLs already included in this run. It lives
/// on globals so nothing a script does can drop it mid-run.
pub const INCLUDES_GLOBAL: &str = "__bareScriptIncludes";

impl Runtime {
    /// Executes the URLs of one `Include` statement in declaration order.
    pub(crate) fn execute_includes(&mut self, includes: &[IncludeEntry], script: &ScriptInfo) -> ExecResult<()> {
        for entry in includes {
            let url = self.resolve_include_url(entry);
            if self.mark_included(&url) {
                continue;
            }

            let failed = || RuntimeError::new(format!("Include of \"{url}\" failed"));
            let response = self
                .fetch_resolved(&FetchRequest::get(url.clone()))
                .map_err(|_| failed())?;
            if !response.ok() {
                return Err(failed());
            }

            let mut included = parse_script(&response.body, Some(&url))?;
            included.system = entry.system || script.system;
            if self.options.debug {
                for warning in lint_script(&included, Some(self.globals())) {
                    self.log(&format!("BareScript: Include \"{url}\" static analysis... {warning}"));
                }
            }

            // nested relative URLs resolve file-relative to this include
            let base = url.clone();
            let include_url_fn: UrlFn = Rc::new(move |nested| url_file_relative(&base, nested));
            let saved_url_fn = self.options.url_fn.replace(include_url_fn);

            let info = ScriptInfo::of(&included);
            let result = self.execute_statements(&info, &included.statements, None);
            self.options.url_fn = saved_url_fn;
            result?;
        }
        Ok(())
    }

    fn resolve_include_url(&self, entry: &IncludeEntry) -> String {
        if entry.system {
            if let Some(prefix) = &self.options.system_prefix {
                return url_file_relative(prefix, &entry.url);
            }
        }
        match &self.options.url_fn {
            Some(url_fn) => url_fn(&entry.url),
            None => entry.url.clone(),
        }
    }

    /// Adds `url` to the deduplication set, returning true when it was
    /// already present.
    fn mark_included(&mut self, url: &str) -> bool {
        let includes = match self
            .globals()
            .borrow_mut()
            .entry(INCLUDES_GLOBAL.to_owned())
            .or_insert_with(Value::empty_object)
        {
            Value::Object(includes) => includes.clone(),
            _ => return false,
        };
        let mut includes = includes.borrow_mut();
        if includes.contains_key(url) {
            return true;
        }
        includes.insert(url.to_owned(), Value::Bool(true));
        false
    }
}
