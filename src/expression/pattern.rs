//! Full-string regular expression matching for LIKE and `matches`.

use crate::expression::{EvalError, EvalResult};
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

// Patterns repeat for every candidate of a query; keep compiled ones per thread.
thread_local! {
    static PATTERN_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

const MAX_CACHED_PATTERNS: usize = 64;

fn compile(pattern: &str) -> EvalResult<Regex> {
    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(regex) = cache.get(pattern) {
            return Ok(regex.clone());
        }

        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            EvalError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;

        if cache.len() >= MAX_CACHED_PATTERNS {
            cache.clear();
        }
        cache.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    })
}

/// Whether `pattern` matches the whole of `text`
pub fn full_match(pattern: &str, text: &str) -> EvalResult<bool> {
    Ok(compile(pattern)?.is_match(text))
}
