//! JavaScript executed through WebDriver `execute`.
//!
//! Every script receives its element arguments as W3C element references and
//! returns plain JSON (plus element references where noted).

/// Key under which W3C WebDriver serializes element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Collect the elements of a document or shadow root.
///
/// `arguments[0]` is `null` for the document, or the shadow host. Returns
/// `null` when the host no longer carries a shadow root.
pub const QUERY_ELEMENTS: &str = r#"
    const host = arguments[0];
    const root = host ? host.shadowRoot : document;
    if (!root) { return null; }
    const out = [];
    const walk = (parent, path) => {
        let index = 0;
        for (const child of Array.from(parent.children)) {
            const childPath = path.concat([index++]);
            const own = Array.from(child.childNodes)
                .filter(n => n.nodeType === Node.TEXT_NODE)
                .map(n => n.textContent)
                .join(' ');
            const attrs = {};
            for (const a of Array.from(child.attributes || [])) { attrs[a.name] = a.value; }
            out.push({
                element: child,
                tag: child.tagName.toLowerCase(),
                text: own,
                attributes: attrs,
                path: childPath,
                shadow: !!child.shadowRoot,
            });
            walk(child, childPath);
        }
    };
    walk(root, []);
    return out;
"#;

/// `true` when `arguments[0]` has an open shadow root.
pub const HAS_SHADOW_ROOT: &str = "return !!(arguments[0] && arguments[0].shadowRoot);";

/// Layout check: size, computed style and hit testing at the centre point.
pub const IS_VISIBLE: &str = r#"
    const el = arguments[0];
    if (!el || !el.isConnected) { return null; }
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') { return false; }
    const rect = el.getBoundingClientRect();
    if (rect.width === 0 || rect.height === 0) { return false; }
    const x = rect.left + rect.width / 2;
    const y = rect.top + rect.height / 2;
    if (x < 0 || y < 0 || x > window.innerWidth || y > window.innerHeight) { return true; }
    const root = el.getRootNode();
    const hit = (root.elementFromPoint ? root : document).elementFromPoint(x, y);
    return !hit || hit === el || el.contains(hit) || hit.contains(el);
"#;

/// Outline `arguments[0]` with colour `arguments[1]`.
pub const HIGHLIGHT: &str = r#"
    const el = arguments[0];
    if (el && el.style) { el.style.outline = '2px solid ' + arguments[1]; }
    return true;
"#;

/// Read a DOM property as a string; `null` when absent.
pub const PROPERTY: &str = r#"
    const value = arguments[0][arguments[1]];
    if (value === undefined || value === null) { return null; }
    return String(value);
"#;
