use crate::features::canvas::InkOp;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
pub struct Text<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

impl<'a> Text<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            kind: "Text",
            text,
            size: None,
        }
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }
}

#[derive(Serialize)]
pub struct Button<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_file_picker: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl<'a> Button<'a> {
    pub fn new(text: &'a str, action: &'a str) -> Self {
        Self {
            kind: "Button",
            text,
            action,
            id: None,
            disabled: None,
            requires_file_picker: None,
            accept: None,
            payload: None,
        }
    }

    pub fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled.then_some(true);
        self
    }

    /// The shell opens a multi-select file picker filtered by `accept`.
    pub fn file_picker(mut self, accept: &'a str) -> Self {
        self.requires_file_picker = Some(true);
        self.accept = Some(accept);
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[derive(Serialize)]
pub struct TextInput<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub bind_key: &'a str,
    pub label: &'a str,
    pub value: &'a str,
    pub input_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plain: Option<bool>,
}

impl<'a> TextInput<'a> {
    pub fn new(bind_key: &'a str, label: &'a str, value: &'a str) -> Self {
        Self {
            kind: "TextInput",
            bind_key,
            label,
            value,
            input_type: "text",
            read_only: None,
            plain: None,
        }
    }

    pub fn input_type(mut self, input_type: &'a str) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only.then_some(true);
        self
    }

    /// Borderless, transparent rendering used while printing.
    pub fn plain(mut self, plain: bool) -> Self {
        self.plain = plain.then_some(true);
        self
    }
}

#[derive(Serialize)]
pub struct Column<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    pub children: Vec<Value>,
}

impl<'a> Column<'a> {
    pub fn new(children: Vec<Value>) -> Self {
        Self {
            kind: "Column",
            id: None,
            padding: None,
            children,
        }
    }

    pub fn id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }
}

#[derive(Serialize)]
pub struct Row {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub children: Vec<Value>,
}

impl Row {
    pub fn new(children: Vec<Value>) -> Self {
        Self {
            kind: "Row",
            children,
        }
    }
}

#[derive(Serialize)]
pub struct Section<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: &'a str,
    pub children: Vec<Value>,
}

impl<'a> Section<'a> {
    pub fn new(title: &'a str, children: Vec<Value>) -> Self {
        Self {
            kind: "Section",
            title,
            children,
        }
    }
}

#[derive(Serialize)]
pub struct Image<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub src: &'a str,
    pub alt: &'a str,
}

impl<'a> Image<'a> {
    pub fn new(src: &'a str, alt: &'a str) -> Self {
        Self {
            kind: "Image",
            src,
            alt,
        }
    }
}

#[derive(Serialize)]
pub struct Modal<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: &'a str,
    pub children: Vec<Value>,
}

impl<'a> Modal<'a> {
    pub fn new(id: &'a str, children: Vec<Value>) -> Self {
        Self {
            kind: "Modal",
            id,
            children,
        }
    }
}

/// Drawing surface mirrored by the shell. `ink` holds the operations
/// recorded since the previous response.
#[derive(Serialize)]
pub struct SignaturePad<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: &'a str,
    pub touch_action: &'static str,
    pub has_signature: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ink: Vec<InkOp>,
}

impl<'a> SignaturePad<'a> {
    pub fn new(id: &'a str) -> Self {
        Self {
            kind: "SignaturePad",
            id,
            touch_action: "none",
            has_signature: false,
            overlay: None,
            snapshot: None,
            ink: Vec::new(),
        }
    }

    pub fn has_signature(mut self, has_signature: bool) -> Self {
        self.has_signature = has_signature;
        self
    }

    pub fn overlay(mut self, text: Option<&'a str>) -> Self {
        self.overlay = text;
        self
    }

    /// Full PNG data URL, for a shell that needs to repaint from scratch.
    pub fn snapshot(mut self, data_url: Option<String>) -> Self {
        self.snapshot = data_url;
        self
    }

    pub fn ink(mut self, ops: Vec<InkOp>) -> Self {
        self.ink = ops;
        self
    }
}

/// Serialize a node, degrading to an error text node instead of panicking.
pub fn node<T: Serialize>(value: T, context: &str) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        json!({
            "type": "Text",
            "text": format!("{context}_serialize_error:{e}")
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_omits_unset_flags() {
        let val = node(Button::new("Clear", "signature_clear"), "btn");
        assert_eq!(val.get("type").and_then(|v| v.as_str()), Some("Button"));
        assert!(val.get("disabled").is_none());
        assert!(val.get("requires_file_picker").is_none());

        let val = node(Button::new("Export", "export_pdf").disabled(true), "btn");
        assert_eq!(val.get("disabled").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn file_picker_button_carries_accept_filter() {
        let val = node(Button::new("Upload", "photo_upload").file_picker("image/*"), "btn");
        assert_eq!(
            val.get("requires_file_picker").and_then(|v| v.as_bool()),
            Some(true)
        );
        assert_eq!(val.get("accept").and_then(|v| v.as_str()), Some("image/*"));
    }

    #[test]
    fn signature_pad_suppresses_touch_scrolling() {
        let pad = SignaturePad::new("signature")
            .overlay(Some("Sign here"))
            .ink(vec![InkOp::Clear]);
        let val = node(pad, "pad");
        assert_eq!(val.get("touch_action").and_then(|v| v.as_str()), Some("none"));
        assert_eq!(val.get("overlay").and_then(|v| v.as_str()), Some("Sign here"));
        assert_eq!(val["ink"][0]["op"], "clear");
        assert!(val.get("snapshot").is_none());
    }

    #[test]
    fn text_input_serializes_binding_and_type() {
        let input = TextInput::new("qty1", "Qty", "3")
            .input_type("number")
            .read_only(false)
            .plain(true);
        let val = node(input, "input");
        assert_eq!(val.get("bind_key").and_then(|v| v.as_str()), Some("qty1"));
        assert_eq!(val.get("input_type").and_then(|v| v.as_str()), Some("number"));
        assert!(val.get("read_only").is_none());
        assert_eq!(val.get("plain").and_then(|v| v.as_bool()), Some(true));
    }
}
