use hashbrown::HashMap;
use std::sync::OnceLock;

/// Interned identifier of a known tag name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TagId(u16);

/// Interned identifier of a known attribute name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttrId(u16);

/// Name→id table the tokenizer consults for tag and attribute names.
///
/// Lookups are pure: the tokenizer owns no interning state and always passes
/// ASCII-lowercased names. Returning `None` marks the name as unknown: the
/// surrounding syntax is still consumed, but no token is produced for an
/// unknown tag.
pub trait NameInterner {
    fn tag_id(&self, name: &str) -> Option<TagId>;
    fn attr_id(&self, name: &str) -> Option<AttrId>;
}

/// Interner backed by the built-in HTML name tables.
#[derive(Debug, Default, Copy, Clone)]
pub struct DefaultInterner;

impl NameInterner for DefaultInterner {
    #[inline]
    fn tag_id(&self, name: &str) -> Option<TagId> {
        tag_map().get(name).copied().map(TagId)
    }

    #[inline]
    fn attr_id(&self, name: &str) -> Option<AttrId> {
        attr_map().get(name).copied().map(AttrId)
    }
}

/// Reverse lookup for ids produced by [`DefaultInterner`].
pub fn tag_name(id: TagId) -> Option<&'static str> {
    TAG_NAMES.get(id.0 as usize).copied()
}

/// Reverse lookup for ids produced by [`DefaultInterner`].
pub fn attr_name(id: AttrId) -> Option<&'static str> {
    ATTR_NAMES.get(id.0 as usize).copied()
}

static TAG_NAMES: &[&str] = &[
    "a", "abbr", "acronym", "address", "applet", "area", "b", "base",
    "basefont", "bdo", "big", "blockquote", "body", "br", "button", "caption",
    "center", "cite", "code", "col", "colgroup", "dd", "del", "dfn", "dir",
    "div", "dl", "dt", "em", "embed", "fieldset", "font", "form", "frame",
    "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "hr", "html",
    "i", "iframe", "img", "input", "ins", "isindex", "kbd", "label", "legend",
    "li", "link", "listing", "map", "marquee", "menu", "meta", "nobr",
    "noembed", "noframes", "noscript", "object", "ol", "optgroup", "option",
    "p", "param", "pre", "q", "s", "samp", "script", "select", "small",
    "span", "strike", "strong", "style", "sub", "sup", "table", "tbody",
    "td", "textarea", "tfoot", "th", "thead", "title", "tr", "tt", "u",
    "ul", "var", "wbr", "xmp",
];

static ATTR_NAMES: &[&str] = &[
    "abbr", "accept", "accept-charset", "accesskey", "action", "align",
    "alink", "alt", "archive", "axis", "background", "bgcolor", "border",
    "cellpadding", "cellspacing", "char", "charoff", "charset", "checked",
    "cite", "class", "classid", "clear", "code", "codebase", "codetype",
    "color", "cols", "colspan", "compact", "content", "coords", "data",
    "datetime", "declare", "defer", "dir", "disabled", "enctype", "face",
    "for", "frame", "frameborder", "headers", "height", "href", "hreflang",
    "hspace", "http-equiv", "id", "ismap", "label", "lang", "language",
    "link", "longdesc", "marginheight", "marginwidth", "maxlength", "media",
    "method", "multiple", "name", "nohref", "noresize", "noshade", "nowrap",
    "object", "onblur", "onchange", "onclick", "ondblclick", "onfocus",
    "onkeydown", "onkeypress", "onkeyup", "onload", "onmousedown",
    "onmousemove", "onmouseout", "onmouseover", "onmouseup", "onreset",
    "onselect", "onsubmit", "onunload", "profile", "prompt", "readonly",
    "rel", "rev", "rows", "rowspan", "rules", "scheme", "scope", "scrolling",
    "selected", "shape", "size", "span", "src", "standby", "start", "style",
    "summary", "tabindex", "target", "text", "title", "type", "usemap",
    "valign", "value", "valuetype", "version", "vlink", "vspace", "width",
];

fn tag_map() -> &'static HashMap<&'static str, u16> {
    static MAP: OnceLock<HashMap<&'static str, u16>> = OnceLock::new();

    MAP.get_or_init(|| build_map(TAG_NAMES))
}

fn attr_map() -> &'static HashMap<&'static str, u16> {
    static MAP: OnceLock<HashMap<&'static str, u16>> = OnceLock::new();

    MAP.get_or_init(|| build_map(ATTR_NAMES))
}

fn build_map(names: &'static [&'static str]) -> HashMap<&'static str, u16> {
    names
        .iter()
        .enumerate()
        .map(|(i, &name)| (name, i as u16))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tag_roundtrip() {
        let id = DefaultInterner.tag_id("script").unwrap();

        assert_eq!(tag_name(id), Some("script"));
    }

    #[test]
    fn unknown_names() {
        assert_eq!(DefaultInterner.tag_id("blink"), None);
        assert_eq!(DefaultInterner.attr_id("onbogus"), None);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        // Callers lowercase before interning.
        assert_eq!(DefaultInterner.tag_id("DIV"), None);
        assert!(DefaultInterner.tag_id("div").is_some());
    }

    #[test]
    fn attr_roundtrip() {
        let id = DefaultInterner.attr_id("http-equiv").unwrap();

        assert_eq!(attr_name(id), Some("http-equiv"));
    }
}
