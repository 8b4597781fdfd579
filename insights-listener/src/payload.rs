// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request and response payloads attached to telemetry properties.

use std::borrow::Cow;

use insights_client::Properties;
use tracing::debug;

use crate::config::DataLoggingOption;
use crate::sample::{DataType, SampleResult};

/// Maximum number of characters kept from a payload.
pub const MAX_DATA_LENGTH: usize = 1024;
pub const TRUNCATED_SUFFIX: &str = "...[TRUNCATED]";
pub const BINARY_PLACEHOLDER: &str = "[BINARY DATA]";

pub const SAMPLE_DATA_KEY: &str = "SampleData";
pub const RESPONSE_DATA_KEY: &str = "ResponseData";

/// Cuts `data` to [`MAX_DATA_LENGTH`] characters and appends [`TRUNCATED_SUFFIX`]. Shorter data is
/// borrowed unchanged.
pub fn truncate(data: &str) -> Cow<'_, str> {
    match data.char_indices().nth(MAX_DATA_LENGTH) {
        None => Cow::Borrowed(data),
        Some((cut, _)) => {
            debug!(
                original_length = data.chars().count(),
                "Truncating payload to {MAX_DATA_LENGTH} characters"
            );
            let mut truncated = String::with_capacity(cut + TRUNCATED_SUFFIX.len());
            truncated.push_str(&data[..cut]);
            truncated.push_str(TRUNCATED_SUFFIX);
            Cow::Owned(truncated)
        }
    }
}

/// Adds `SampleData` and `ResponseData` to `properties` when the respective policy permits it for
/// the outcome of `sample`. Request data is only added when the sample carries some.
pub fn attach_payloads(
    properties: &mut Properties,
    sample: &SampleResult,
    request_policy: DataLoggingOption,
    response_policy: DataLoggingOption,
) {
    if request_policy.permits(sample.successful) {
        if let Some(data) = &sample.sampler_data {
            let value = match sample.data_type {
                DataType::Binary => BINARY_PLACEHOLDER.to_owned(),
                DataType::Text => truncate(data).into_owned(),
            };
            properties.insert(SAMPLE_DATA_KEY.to_owned(), value);
        }
    }

    if response_policy.permits(sample.successful) {
        let data = sample.response_data_as_string();
        properties.insert(RESPONSE_DATA_KEY.to_owned(), truncate(&data).into_owned());
    }
}
