// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;

/// Parameters the host passes to the listener, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListenerContext {
    parameters: IndexMap<String, String>,
    test_start_time: Option<i64>,
}

impl ListenerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value under the same name.
    pub fn add_argument(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Sets the start of the test run in milliseconds since the Unix epoch. When unset the
    /// listener uses the time `setup_test` is called.
    pub fn set_test_start_time(&mut self, millis: i64) -> &mut Self {
        self.test_start_time = Some(millis);
        self
    }

    pub fn test_start_time(&self) -> Option<i64> {
        self.test_start_time
    }

    pub fn get_parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn get_parameter_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get_parameter(name).unwrap_or(default)
    }

    /// `default` when the parameter is absent, otherwise whether it reads `true`.
    pub fn get_bool_parameter(&self, name: &str, default: bool) -> bool {
        match self.get_parameter(name) {
            Some(value) => value.trim().eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ListenerContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Self::new();
        for (name, value) in iter {
            context.add_argument(name, value);
        }
        context
    }
}
