// Copyright © 2024 BlogFlow. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Core Traits Module
//!
//! Shared traits used by several pipeline stages.
//!
//! - [`ToContext`]: converts a domain value into the JSON context handed
//!   to templates.

use serde_json::Value as JsonValue;

/// Trait for types that can be converted into a template context.
///
/// Posts, listing pages and pagination links all implement it so layouts
/// see one consistent shape regardless of where a value came from.
pub trait ToContext {
    /// Converts the value into a template context.
    fn to_context(&self) -> JsonValue;
}

impl ToContext for JsonValue {
    fn to_context(&self) -> JsonValue {
        self.clone()
    }
}

impl<T: ToContext> ToContext for [T] {
    fn to_context(&self) -> JsonValue {
        JsonValue::Array(self.iter().map(ToContext::to_context).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Named(&'static str);

    impl ToContext for Named {
        fn to_context(&self) -> JsonValue {
            json!({ "name": self.0 })
        }
    }

    #[test]
    fn test_json_value_is_its_own_context() {
        let value = json!({"title": "Hello"});
        assert_eq!(value.to_context(), value);
    }

    #[test]
    fn test_slices_become_arrays() {
        let items = vec![Named("a"), Named("b")];
        assert_eq!(
            items.to_context(),
            json!([{ "name": "a" }, { "name": "b" }])
        );
    }
}
