// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

use regex::Regex;

use crate::error::ConfigError;

/// Selects the samples that are reported, by sampler label.
#[derive(Clone, Debug)]
pub enum SamplerFilter {
    /// Every sample is reported.
    All,
    /// Exact, case-sensitive label membership.
    Names(HashSet<String>),
    /// Whole-label regular expression match.
    Pattern(Regex),
}

impl SamplerFilter {
    /// Builds a filter from the sampler list parameter.
    ///
    /// An empty list (after trimming) reports every sample. In literal mode the list is split on
    /// `;` and empty names are dropped; in regex mode the list is one pattern which must match
    /// the whole label.
    ///
    /// # Errors
    /// Fails in regex mode when the pattern does not compile.
    pub fn new(samplers_list: &str, use_regex: bool) -> Result<Self, ConfigError> {
        let samplers_list = samplers_list.trim();
        if samplers_list.is_empty() {
            return Ok(Self::All);
        }

        if use_regex {
            let pattern = Regex::new(&format!("^(?:{samplers_list})$")).map_err(|source| {
                ConfigError::InvalidSamplerRegex {
                    pattern: samplers_list.to_owned(),
                    source,
                }
            })?;
            Ok(Self::Pattern(pattern))
        } else {
            Ok(Self::Names(
                samplers_list
                    .split(';')
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned)
                    .collect(),
            ))
        }
    }

    pub fn should_report(&self, label: &str) -> bool {
        match self {
            Self::All => true,
            Self::Names(names) => names.contains(label),
            Self::Pattern(pattern) => pattern.is_match(label),
        }
    }

    /// Drops the literal name set.
    pub fn clear(&mut self) {
        if let Self::Names(names) = self {
            names.clear();
        }
    }
}
