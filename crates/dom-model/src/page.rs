use std::collections::HashSet;

use tracing::debug;
use url::Url;

use crate::errors::DomError;
use crate::mutation::MutationRecord;
use crate::node::{ElementData, Node, NodeId, NodeKind, ShadowRootMode, WindowId};
use crate::parse;
use crate::xpath;

/// One browsing context: the top-level page or a frame.
#[derive(Debug, Clone)]
pub struct Window {
    pub(crate) document: NodeId,
    pub(crate) parent: Option<WindowId>,
    pub(crate) url: String,
    pub(crate) origin: String,
    /// The `<iframe>`/`<frame>` hosting this window inside the parent document.
    pub(crate) frame_element: Option<NodeId>,
}

impl Window {
    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn parent(&self) -> Option<WindowId> {
        self.parent
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    nodes: Vec<Node>,
    windows: Vec<Window>,
    mutations: Vec<MutationRecord>,
}

const FRAME_TAGS: [&str; 2] = ["iframe", "frame"];

/// Serialized origin of a URL; opaque URLs fall back to the URL itself.
pub fn origin_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => url.to_string(),
    }
}

impl Page {
    /// Empty top-level window with an empty document.
    pub fn new(url: &str) -> Self {
        let mut page = Self {
            nodes: Vec::new(),
            windows: Vec::new(),
            mutations: Vec::new(),
        };
        page.push_window(None, url, origin_of(url), None);
        page
    }

    /// Parses `html` into the top-level document of a new page.
    pub fn parse(html: &str, url: &str) -> Result<Self, DomError> {
        let mut page = Self::new(url);
        let top = page.top_window();
        let document = page.document(top);
        parse::parse_into(&mut page, document, top, html)?;
        Ok(page)
    }

    fn push_window(
        &mut self,
        parent: Option<WindowId>,
        url: &str,
        origin: String,
        frame_element: Option<NodeId>,
    ) -> WindowId {
        let window = WindowId(self.windows.len());
        let document = self.push_node(None, NodeKind::Document { window });
        self.windows.push(Window {
            document,
            parent,
            url: url.to_string(),
            origin,
            frame_element,
        });
        window
    }

    fn push_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(data) => Ok(data),
            _ => Err(DomError::InvalidNode(format!("{id} is not an element"))),
        }
    }

    // ----- windows & frames -----

    pub fn top_window(&self) -> WindowId {
        WindowId(0)
    }

    pub fn windows(&self) -> impl Iterator<Item = WindowId> + '_ {
        (0..self.windows.len()).map(WindowId)
    }

    pub fn window(&self, id: WindowId) -> &Window {
        &self.windows[id.0]
    }

    pub fn document(&self, window: WindowId) -> NodeId {
        self.windows[window.0].document
    }

    pub fn parent_window(&self, window: WindowId) -> Option<WindowId> {
        self.windows[window.0].parent
    }

    pub fn is_top(&self, window: WindowId) -> bool {
        self.windows[window.0].parent.is_none()
    }

    pub fn same_origin(&self, a: WindowId, b: WindowId) -> bool {
        self.windows[a.0].origin == self.windows[b.0].origin
    }

    /// `window.parent.document` as seen from `window`. `Ok(None)` at the top.
    pub fn parent_document(&self, window: WindowId) -> Result<Option<NodeId>, DomError> {
        let Some(parent) = self.parent_window(window) else {
            return Ok(None);
        };
        if !self.same_origin(window, parent) {
            return Err(DomError::CrossOrigin {
                child: self.windows[window.0].origin.clone(),
                parent: self.windows[parent.0].origin.clone(),
            });
        }
        Ok(Some(self.document(parent)))
    }

    /// Engine-side link from a window to its frame element. Capture code must
    /// go through [`Page::parent_document`] instead; this exists for harnesses.
    pub fn frame_element(&self, window: WindowId) -> Option<NodeId> {
        self.windows[window.0].frame_element
    }

    /// `document.querySelectorAll('iframe, frame')`, in document order.
    pub fn frame_elements(&self, document: NodeId) -> Vec<NodeId> {
        self.descendants(document)
            .into_iter()
            .filter(|id| {
                self.tag(*id)
                    .map(|tag| FRAME_TAGS.contains(&tag))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn content_window(&self, frame: NodeId) -> Option<WindowId> {
        self.element(frame).and_then(|data| data.content_window)
    }

    /// Creates (or replaces) the browsing context behind a frame element and
    /// parses `html` into its document.
    pub fn load_frame(&mut self, frame: NodeId, html: &str, url: &str) -> Result<WindowId, DomError> {
        let host_window = self.window_of(frame).ok_or_else(|| {
            DomError::InvalidNode(format!("{frame} is not attached to a window"))
        })?;
        let origin = if url.starts_with("about:") {
            self.windows[host_window.0].origin.clone()
        } else {
            origin_of(url)
        };
        self.load_frame_with_origin(frame, host_window, html, url, origin)
    }

    pub(crate) fn load_frame_with_origin(
        &mut self,
        frame: NodeId,
        parent: WindowId,
        html: &str,
        url: &str,
        origin: String,
    ) -> Result<WindowId, DomError> {
        let is_frame = self
            .tag(frame)
            .map(|tag| FRAME_TAGS.contains(&tag))
            .unwrap_or(false);
        if !is_frame {
            return Err(DomError::InvalidNode(format!("{frame} is not a frame element")));
        }
        let window = self.push_window(Some(parent), url, origin, Some(frame));
        self.element_mut(frame)?.content_window = Some(window);
        let document = self.document(window);
        parse::parse_into(self, document, window, html)?;
        debug!(target: "dom-model", %window, url, "frame loaded");
        Ok(window)
    }

    // ----- node queries -----

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id).kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|data| data.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|data| data.attr(name))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    pub fn is_document(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Document { .. })
    }

    pub fn is_shadow_root(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::ShadowRoot { .. })
    }

    /// `node.getRootNode()`: the document or shadow root at the top of the
    /// node's tree, or the topmost ancestor of a detached subtree.
    pub fn root_node(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            current = parent;
        }
        current
    }

    pub fn shadow_host(&self, root: NodeId) -> Option<NodeId> {
        match self.node(root).kind {
            NodeKind::ShadowRoot { host, .. } => Some(host),
            _ => None,
        }
    }

    pub fn shadow_mode(&self, root: NodeId) -> Option<ShadowRootMode> {
        match self.node(root).kind {
            NodeKind::ShadowRoot { mode, .. } => Some(mode),
            _ => None,
        }
    }

    /// `element.shadowRoot`: closed roots are invisible.
    pub fn open_shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.shadow_root_any(host)
            .filter(|root| self.shadow_mode(*root) == Some(ShadowRootMode::Open))
    }

    /// Engine-side access to a host's shadow root regardless of mode.
    pub fn shadow_root_any(&self, host: NodeId) -> Option<NodeId> {
        self.element(host).and_then(|data| data.shadow_root)
    }

    /// Document owning `id`, piercing shadow boundaries outward.
    pub fn owner_document(&self, id: NodeId) -> Option<NodeId> {
        let mut root = self.root_node(id);
        loop {
            match self.node(root).kind {
                NodeKind::Document { .. } => return Some(root),
                NodeKind::ShadowRoot { host, .. } => root = self.root_node(host),
                _ => return None,
            }
        }
    }

    pub fn window_of(&self, id: NodeId) -> Option<WindowId> {
        let document = self.owner_document(id)?;
        match self.node(document).kind {
            NodeKind::Document { window } => Some(window),
            _ => None,
        }
    }

    pub fn document_element(&self, document: NodeId) -> Option<NodeId> {
        self.children(document)
            .iter()
            .copied()
            .find(|child| self.is_element(*child))
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.owner_document(id).is_some()
    }

    /// `node.textContent`: concatenated descendant text, not crossing into
    /// shadow trees.
    pub fn text_content(&self, id: NodeId) -> String {
        if let NodeKind::Text(text) = &self.node(id).kind {
            return text.clone();
        }
        let mut out = String::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            match &self.node(current).kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Element(data) if data.tag == "script" || data.tag == "style" => {}
                _ => stack.extend(self.children(current).iter().rev().copied()),
            }
        }
        out
    }

    /// Descendant elements of `root` in tree order, excluding `root` itself.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.is_element(current) {
                out.push(current);
                stack.extend(self.children(current).iter().rev().copied());
            }
        }
        out
    }

    /// 1-based position of `id` among its same-tag element siblings.
    pub fn same_tag_position(&self, id: NodeId) -> usize {
        let (Some(tag), Some(parent)) = (self.tag(id), self.parent(id)) else {
            return 1;
        };
        let mut position = 0;
        for sibling in self.children(parent) {
            if self.tag(*sibling) == Some(tag) {
                position += 1;
            }
            if *sibling == id {
                break;
            }
        }
        position.max(1)
    }

    /// The `value` property. Plain elements have none unless a script set one.
    pub fn value(&self, id: NodeId) -> Option<String> {
        let data = self.element(id)?;
        if data.tag == "select" {
            return self.selected_option(id).map(|(value, _)| value);
        }
        data.value.clone()
    }

    pub fn checked(&self, id: NodeId) -> bool {
        self.element(id).map(|data| data.checked).unwrap_or(false)
    }

    /// `element.isContentEditable`, inherited through ancestors in the same tree.
    pub fn is_content_editable(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(value) = self.attr(node, "contenteditable") {
                let value = value.trim().to_ascii_lowercase();
                return matches!(value.as_str(), "" | "true" | "plaintext-only");
            }
            current = self.parent_element(node);
        }
        false
    }

    /// Selected `(value, label)` of a `<select>`: the live value when set,
    /// else the first option marked `selected`, else the first option.
    pub fn selected_option(&self, select: NodeId) -> Option<(String, String)> {
        let options: Vec<NodeId> = self
            .descendants(select)
            .into_iter()
            .filter(|id| self.tag(*id) == Some("option"))
            .collect();
        let option_value = |id: NodeId| {
            self.attr(id, "value")
                .map(str::to_string)
                .unwrap_or_else(|| normalize_space(&self.text_content(id)))
        };
        let live = self.element(select).and_then(|data| data.value.clone());
        let chosen = match live {
            Some(value) => options.iter().copied().find(|id| option_value(*id) == value),
            None => options
                .iter()
                .copied()
                .find(|id| self.attr(*id, "selected").is_some())
                .or_else(|| options.first().copied()),
        }?;
        Some((option_value(chosen), normalize_space(&self.text_content(chosen))))
    }

    /// Rough layout-free visibility: hidden attributes, inline display/visibility
    /// styles, hidden inputs and non-rendered tags, checked up through shadow hosts.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(data) = self.element(node) {
                if data.attr("hidden").is_some() {
                    return false;
                }
                if matches!(data.tag.as_str(), "script" | "style" | "template" | "head") {
                    return false;
                }
                if data.tag == "input"
                    && data
                        .attr("type")
                        .map(|t| t.eq_ignore_ascii_case("hidden"))
                        .unwrap_or(false)
                {
                    return false;
                }
                if let Some(style) = data.attr("style") {
                    let compact: String = style
                        .chars()
                        .filter(|c| !c.is_whitespace())
                        .collect::<String>()
                        .to_ascii_lowercase();
                    if compact.contains("display:none") || compact.contains("visibility:hidden") {
                        return false;
                    }
                }
            }
            current = match self.node(node).parent {
                Some(parent) => Some(parent),
                None => self.shadow_host(node),
            };
        }
        true
    }

    /// Evaluates an XPath expression with `context` as the context node.
    pub fn evaluate_xpath(&self, expr: &str, context: NodeId) -> Result<Vec<NodeId>, DomError> {
        xpath::evaluate(self, expr, context)
    }

    // ----- mutation -----

    pub fn create_element(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        let attrs = attrs
            .into_iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value))
            .collect();
        self.push_node(None, NodeKind::Element(ElementData::new(tag, attrs)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(None, NodeKind::Text(text.to_string()))
    }

    /// Appends without notifying observers; used while parsing.
    pub(crate) fn append_silent(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.node(child).parent.is_some() {
            return Err(DomError::InvalidNode(format!("{child} already has a parent")));
        }
        if matches!(
            self.node(child).kind,
            NodeKind::Document { .. } | NodeKind::ShadowRoot { .. }
        ) {
            return Err(DomError::InvalidNode(format!("{child} cannot be inserted")));
        }
        if matches!(self.node(parent).kind, NodeKind::Text(_)) {
            return Err(DomError::InvalidNode(format!("{parent} cannot have children")));
        }
        let mut ancestor = Some(parent);
        while let Some(node) = ancestor {
            if node == child {
                return Err(DomError::InvalidNode(format!("{child} would contain itself")));
            }
            ancestor = self.node(node).parent;
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.append_silent(parent, child)?;
        let root = self.root_node(parent);
        self.mutations
            .push(MutationRecord::added(root, parent, vec![child]));
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let position = self
            .children(parent)
            .iter()
            .position(|id| *id == child)
            .ok_or_else(|| DomError::InvalidNode(format!("{child} is not a child of {parent}")))?;
        let root = self.root_node(parent);
        self.nodes[parent.0].children.remove(position);
        self.nodes[child.0].parent = None;
        self.mutations
            .push(MutationRecord::removed(root, parent, vec![child]));
        Ok(())
    }

    /// `host.attachShadow({ mode })`. Does not notify observers, like the
    /// platform: a root attached to an already-connected host is only found
    /// by a later scan.
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> Result<NodeId, DomError> {
        let data = self
            .element(host)
            .ok_or_else(|| DomError::InvalidNode(format!("{host} is not an element")))?;
        if data.shadow_root.is_some() {
            return Err(DomError::ShadowAlreadyAttached(data.tag.clone()));
        }
        let root = self.push_node(None, NodeKind::ShadowRoot { host, mode });
        self.element_mut(host)?.shadow_root = Some(root);
        Ok(root)
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?.value = Some(value.to_string());
        Ok(())
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<(), DomError> {
        self.element_mut(id)?.checked = checked;
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?.set_attr(name, value);
        Ok(())
    }

    /// Parses an HTML fragment and appends its top-level nodes to `parent`,
    /// producing one mutation record per inserted node.
    pub fn insert_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>, DomError> {
        let window = self
            .window_of(parent)
            .ok_or_else(|| DomError::InvalidNode(format!("{parent} is not connected")))?;
        let holder = self.create_element("template", Vec::new());
        parse::parse_into(self, holder, window, html)?;
        let inserted: Vec<NodeId> = self.children(holder).to_vec();
        self.nodes[holder.0].children.clear();
        for child in &inserted {
            self.nodes[child.0].parent = None;
            self.append_child(parent, *child)?;
        }
        Ok(inserted)
    }

    /// Drains the structural change log.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    /// Tree-order key used to sort query results.
    pub(crate) fn order_key(&self, id: NodeId) -> Vec<usize> {
        let mut key = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            let index = self
                .children(parent)
                .iter()
                .position(|child| *child == current)
                .unwrap_or(0);
            key.push(index);
            current = parent;
        }
        key.reverse();
        key
    }

    /// Every shadow root (open or closed) reachable from `root`, nested ones included.
    pub fn all_shadow_roots(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut work = vec![root];
        while let Some(scope) = work.pop() {
            for element in self.descendants(scope) {
                if let Some(shadow) = self.shadow_root_any(element) {
                    if seen.insert(shadow) {
                        out.push(shadow);
                        work.push(shadow);
                    }
                }
            }
        }
        out
    }
}

/// XPath `normalize-space()`.
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
