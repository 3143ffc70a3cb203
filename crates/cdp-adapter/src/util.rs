//! Page-side scripts used by the Chromium implementation.

use serde_json::Value;

use crate::commands::{AnchorDescriptor, ForcedState};

/// Attribute stamped on resolved elements so later commands can re-query them.
pub(crate) const REF_ATTR: &str = "data-formpilot-ref";

pub(crate) fn js_str(raw: &str) -> String {
    serde_json::to_string(raw).unwrap_or_else(|_| "\"\"".to_string())
}

const VISIBILITY_FN: &str = r#"
    const isVisible = (el) => {
        if (!(el instanceof Element)) return false;
        const style = window.getComputedStyle(el);
        if (style.visibility === 'hidden' || style.display === 'none') return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 || rect.height > 0 || el.getClientRects().length > 0;
    };
"#;

const IMPLICIT_ROLES_FN: &str = r#"
    const roleOf = (el) => {
        const explicit = el.getAttribute('role');
        if (explicit) return explicit.toLowerCase();
        const tag = el.tagName.toLowerCase();
        const type = (el.getAttribute('type') || '').toLowerCase();
        if (tag === 'button') return 'button';
        if (tag === 'a' && el.hasAttribute('href')) return 'link';
        if (tag === 'dialog') return 'dialog';
        if (tag === 'select') return 'combobox';
        if (tag === 'textarea') return 'textbox';
        if (tag === 'input') {
            if (type === 'checkbox') return 'checkbox';
            if (type === 'radio') return 'radio';
            if (['button', 'submit', 'reset'].includes(type)) return 'button';
            if (type === 'file') return 'file';
            return 'textbox';
        }
        return '';
    };
    const nameOf = (el) => {
        const label = el.getAttribute('aria-label');
        if (label) return label.trim();
        const labelledby = el.getAttribute('aria-labelledby');
        if (labelledby) {
            return labelledby.split(/\s+/)
                .map(id => document.getElementById(id))
                .map(node => node ? (node.textContent || '') : '')
                .join(' ')
                .trim();
        }
        if (el.labels && el.labels.length) return (el.labels[0].textContent || '').trim();
        if (el.title) return el.title.trim();
        if (el.value && el.tagName.toLowerCase() === 'input') return String(el.value).trim();
        return (el.innerText || el.textContent || '').trim();
    };
"#;

/// Build a script that finds the first element matching `anchor`, stamps it
/// with `token` and returns `{status, selector}`.
pub(crate) fn resolve_script(anchor: &AnchorDescriptor, token: &str, include_hidden: bool) -> String {
    let candidates = match anchor {
        AnchorDescriptor::Css(selector) => format!(
            "(() => {{ try {{ return Array.from(document.querySelectorAll({sel})); }} catch (_) {{ return []; }} }})()",
            sel = js_str(selector)
        ),
        AnchorDescriptor::Aria { role, name } => format!(
            r#"Array.from(document.querySelectorAll('body *')).filter(el => {{
                if (roleOf(el) !== {role}) return false;
                const wanted = {name}.trim().toLowerCase();
                return !wanted || nameOf(el).toLowerCase() === wanted;
            }})"#,
            role = js_str(&role.to_ascii_lowercase()),
            name = js_str(name),
        ),
        AnchorDescriptor::Text { content, exact } => format!(
            r#"Array.from(document.querySelectorAll('body *')).filter(el => {{
                const own = Array.from(el.childNodes)
                    .filter(node => node.nodeType === Node.TEXT_NODE)
                    .map(node => node.textContent || '')
                    .join(' ')
                    .trim()
                    .toLowerCase();
                const full = (el.innerText || el.textContent || '').trim().toLowerCase();
                const wanted = {text}.trim().toLowerCase();
                if (!wanted) return false;
                return {exact} ? (own === wanted || full === wanted) : own.includes(wanted);
            }})"#,
            text = js_str(content),
            exact = if *exact { "true" } else { "false" },
        ),
    };

    format!(
        r#"(() => {{
            {VISIBILITY_FN}
            {IMPLICIT_ROLES_FN}
            const attr = {attr};
            const token = {token};
            const includeHidden = {include_hidden};
            const match = ({candidates}).find(el => includeHidden || isVisible(el));
            if (!match) {{
                return {{ status: 'not-found' }};
            }}
            match.setAttribute(attr, token);
            const label = (match.getAttribute('aria-label') || match.innerText || match.tagName || '').trim().slice(0, 80);
            return {{ status: 'ok', selector: '[' + attr + '="' + token + '"]', label }};
        }})()"#,
        attr = js_str(REF_ATTR),
        token = js_str(token),
        include_hidden = if include_hidden { "true" } else { "false" },
    )
}

pub(crate) fn extract_selector(value: &Value) -> Option<(String, String)> {
    if value.get("status").and_then(Value::as_str) != Some("ok") {
        return None;
    }
    let selector = value.get("selector").and_then(Value::as_str)?.to_string();
    let label = value
        .get("label")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((selector, label))
}

pub(crate) fn element_state_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return null;
            const attr = (name) => el.getAttribute(name);
            return {{
                tag: el.tagName.toLowerCase(),
                input_type: attr('type'),
                id: el.id || null,
                name: attr('name'),
                value: el.value !== undefined && el.value !== null ? String(el.value) : '',
                checked: !!el.checked || attr('aria-checked') === 'true' || attr('aria-selected') === 'true',
                text: (el.innerText || el.textContent || '').trim(),
            }};
        }})()"#,
        sel = js_str(selector)
    )
}

const SET_VALUE_FN: &str = r#"
    const setValue = (el, value) => {
        const proto = el instanceof HTMLTextAreaElement
            ? HTMLTextAreaElement.prototype
            : HTMLInputElement.prototype;
        const setter = Object.getOwnPropertyDescriptor(proto, 'value');
        if (setter && setter.set) {
            setter.set.call(el, value);
        } else {
            el.value = value;
        }
        el.dispatchEvent(new Event('input', { bubbles: true }));
        el.dispatchEvent(new Event('change', { bubbles: true }));
    };
"#;

pub(crate) fn clear_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            {SET_VALUE_FN}
            const el = document.querySelector({sel});
            if (!el) return false;
            setValue(el, '');
            return true;
        }})()"#,
        sel = js_str(selector)
    )
}

pub(crate) fn select_all_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.focus();
            if (typeof el.select === 'function') el.select();
            return true;
        }})()"#,
        sel = js_str(selector)
    )
}

pub(crate) fn force_state_script(selector: &str, state: &ForcedState) -> String {
    let body = match state {
        ForcedState::Checked(flag) => format!(
            r#"el.checked = {flag};
            if (el.hasAttribute('aria-checked')) el.setAttribute('aria-checked', String({flag}));
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));"#
        ),
        ForcedState::Value(value) => format!("setValue(el, {});", js_str(value)),
    };
    format!(
        r#"(() => {{
            {SET_VALUE_FN}
            const el = document.querySelector({sel});
            if (!el) return false;
            {body}
            return true;
        }})()"#,
        sel = js_str(selector)
    )
}

pub(crate) const PAGE_TEXT_SCRIPT: &str =
    "(() => document.body ? (document.body.innerText || '') : '')()";

pub(crate) const NETWORK_PROBE_SCRIPT: &str = r#"(() => ({
    ready: document.readyState,
    resources: performance.getEntriesByType('resource').length,
}))()"#;

pub(crate) const EXPORT_STORAGE_SCRIPT: &str = r#"(() => {
    const out = {};
    try {
        for (let i = 0; i < localStorage.length; i++) {
            const key = localStorage.key(i);
            out[key] = localStorage.getItem(key);
        }
    } catch (_) {}
    return out;
})()"#;

pub(crate) fn restore_storage_script(entries: &Value) -> String {
    format!(
        r#"(() => {{
            const entries = {entries};
            try {{
                for (const [key, value] of Object.entries(entries)) {{
                    localStorage.setItem(key, value);
                }}
            }} catch (_) {{ return false; }}
            return true;
        }})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_script_embeds_quoted_inputs() {
        let script = resolve_script(&AnchorDescriptor::aria("button", "Say \"hi\""), "tok-1", false);
        assert!(script.contains(r#""Say \"hi\"""#));
        assert!(script.contains(r#""tok-1""#));
        assert!(script.contains(REF_ATTR));
        assert!(script.contains("const includeHidden = false"));
    }

    #[test]
    fn extracts_selector_only_on_ok() {
        let ok = json!({"status": "ok", "selector": "[a=\"b\"]", "label": "Next"});
        assert_eq!(
            extract_selector(&ok),
            Some(("[a=\"b\"]".to_string(), "Next".to_string()))
        );
        assert!(extract_selector(&json!({"status": "not-found"})).is_none());
    }
}
