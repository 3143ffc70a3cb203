//! Form interaction layer
//!
//! Every operation returns an [`Outcome`](action_primitives::Outcome): expected
//! conditions (field missing, value mismatch, option absent, modal stuck) are
//! failed outcomes, never errors. `Err(ActionError)` only carries transport
//! failures up to the step-handler boundary.

mod checkbox;
mod dropdown;
mod fill;
mod modal;
mod password;
mod typeahead;
mod upload;

pub use checkbox::{ensure_checked, select_with_verification};
pub use dropdown::select_dropdown;
pub use fill::{fill_and_verify, fill_optional};
pub use modal::{close_modal, open_modal, save_modal, ModalSpec};
pub use password::fill_password;
pub use typeahead::{choose_typeahead, TypeaheadMode};
pub use upload::upload_file;

use cdp_adapter::AnchorDescriptor;

/// Code label of a catalog key: `account.first_name` -> `first_name`.
pub fn field_label(key: &str) -> &str {
    key.rsplit('.').next().unwrap_or(key)
}

/// Anchors that pick an option/suggestion by its visible name.
pub fn option_anchors(value: &str) -> Vec<AnchorDescriptor> {
    vec![
        AnchorDescriptor::aria("option", value),
        AnchorDescriptor::exact_text(value),
    ]
}

/// Placeholder in catalog anchors that stands for the value being entered.
pub const VALUE_SLOT: &str = "{value}";

/// Catalog anchors with [`VALUE_SLOT`] replaced by `value`.
pub fn anchors_for_value(anchors: &[AnchorDescriptor], value: &str) -> Vec<AnchorDescriptor> {
    anchors
        .iter()
        .map(|anchor| match anchor {
            AnchorDescriptor::Css(selector) => AnchorDescriptor::css(selector.replace(VALUE_SLOT, value)),
            AnchorDescriptor::Aria { role, name } => {
                AnchorDescriptor::aria(role.clone(), name.replace(VALUE_SLOT, value))
            }
            AnchorDescriptor::Text { content, exact } => AnchorDescriptor::Text {
                content: content.replace(VALUE_SLOT, value),
                exact: *exact,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_slot_is_filled_in_every_anchor_form() {
        let anchors = [
            AnchorDescriptor::css(r#"[data-test="token"][title="{value}"]"#),
            AnchorDescriptor::aria("button", "Remove {value}"),
            AnchorDescriptor::exact_text("Next"),
        ];
        assert_eq!(
            anchors_for_value(&anchors, "Rust"),
            vec![
                AnchorDescriptor::css(r#"[data-test="token"][title="Rust"]"#),
                AnchorDescriptor::aria("button", "Remove Rust"),
                AnchorDescriptor::exact_text("Next"),
            ]
        );
    }

    #[test]
    fn labels_use_the_last_key_segment() {
        assert_eq!(field_label("account.first_name"), "first_name");
        assert_eq!(field_label("plain"), "plain");
    }
}
