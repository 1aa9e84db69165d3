//! Render targets for the reveal engine.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::markup::Shell;

/// One incarnation of a mount point's content. Clearing a mount point moves
/// it to a new epoch, which is how an in-flight reveal notices it lost the
/// target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// An attachable, clearable container the reveal engine writes into.
pub trait MountPoint {
    type Handle: Copy;

    /// Handle of the container itself.
    fn root(&self) -> Self::Handle;

    /// Mount an empty copy of `shell` as the last child of `parent`.
    fn attach_child(&mut self, parent: Self::Handle, shell: &Shell) -> Self::Handle;

    /// Append one glyph of escaped text to `parent`.
    fn append_char(&mut self, parent: Self::Handle, glyph: &str);

    /// Drop all content and start a new epoch.
    fn clear(&mut self);

    fn epoch(&self) -> Epoch;

    /// Whether this is still the target a reveal started on at `epoch`.
    fn is_still_live(&self, epoch: Epoch) -> bool {
        self.epoch() == epoch
    }
}

impl<M: MountPoint + ?Sized> MountPoint for &mut M {
    type Handle = M::Handle;

    fn root(&self) -> Self::Handle {
        (**self).root()
    }

    fn attach_child(&mut self, parent: Self::Handle, shell: &Shell) -> Self::Handle {
        (**self).attach_child(parent, shell)
    }

    fn append_char(&mut self, parent: Self::Handle, glyph: &str) {
        (**self).append_char(parent, glyph);
    }

    fn clear(&mut self) {
        (**self).clear();
    }

    fn epoch(&self) -> Epoch {
        (**self).epoch()
    }

    fn is_still_live(&self, epoch: Epoch) -> bool {
        (**self).is_still_live(epoch)
    }
}

/// Node id inside a [`MarkupBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum Content {
    Root,
    Element(Shell),
    Text(String),
}

#[derive(Debug, Clone)]
struct BufferNode {
    content: Content,
    children: Vec<usize>,
}

/// In-memory mount point that serializes to HTML.
///
/// Every element is stored whole (open tag, children, close tag are produced
/// at serialization time), so `to_html` is well-formed after any write.
#[derive(Debug, Clone)]
pub struct MarkupBuffer {
    nodes: Vec<BufferNode>,
    epoch: Epoch,
    writes: usize,
}

impl Default for MarkupBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupBuffer {
    pub fn new() -> Self {
        Self {
            nodes: vec![BufferNode {
                content: Content::Root,
                children: Vec::new(),
            }],
            epoch: Epoch::default(),
            writes: 0,
        }
    }

    /// Total number of mounts and appends since creation, across clears.
    pub const fn writes(&self) -> usize {
        self.writes
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_children(0, &mut out);
        out
    }

    fn write_children(&self, id: usize, out: &mut String) {
        for &child in &self.nodes[id].children {
            match &self.nodes[child].content {
                Content::Root => {}
                Content::Text(text) => out.push_str(text),
                Content::Element(shell) => {
                    shell.write_open(out);
                    self.write_children(child, out);
                    shell.write_close(out);
                }
            }
        }
    }

    fn push(&mut self, parent: usize, content: Content) -> usize {
        let id = self.nodes.len();
        self.nodes.push(BufferNode {
            content,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }
}

impl MountPoint for MarkupBuffer {
    type Handle = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn attach_child(&mut self, parent: NodeId, shell: &Shell) -> NodeId {
        self.writes += 1;
        NodeId(self.push(parent.0, Content::Element(shell.clone())))
    }

    fn append_char(&mut self, parent: NodeId, glyph: &str) {
        self.writes += 1;
        let last = self.nodes[parent.0].children.last().copied();
        if let Some(last) = last
            && let Content::Text(text) = &mut self.nodes[last].content
        {
            text.push_str(glyph);
            return;
        }
        self.push(parent.0, Content::Text(glyph.to_string()));
    }

    fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].children.clear();
        self.epoch = self.epoch.next();
    }

    fn epoch(&self) -> Epoch {
        self.epoch
    }
}

/// A mount point shared between a reveal and the host that owns it, so the
/// host can clear or replace the content while a reveal is in flight.
#[derive(Debug, Default)]
pub struct SharedMount<M> {
    inner: Rc<RefCell<M>>,
}

impl<M> Clone for SharedMount<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M: MountPoint> SharedMount<M> {
    pub fn new(mount: M) -> Self {
        Self {
            inner: Rc::new(RefCell::new(mount)),
        }
    }

    pub fn borrow(&self) -> Ref<'_, M> {
        self.inner.borrow()
    }

    /// Clear the shared target; any reveal holding a clone stops at its
    /// next frame.
    pub fn detach(&self) {
        self.inner.borrow_mut().clear();
    }
}

impl<M: MountPoint> MountPoint for SharedMount<M> {
    type Handle = M::Handle;

    fn root(&self) -> Self::Handle {
        self.inner.borrow().root()
    }

    fn attach_child(&mut self, parent: Self::Handle, shell: &Shell) -> Self::Handle {
        self.inner.borrow_mut().attach_child(parent, shell)
    }

    fn append_char(&mut self, parent: Self::Handle, glyph: &str) {
        self.inner.borrow_mut().append_char(parent, glyph);
    }

    fn clear(&mut self) {
        self.inner.borrow_mut().clear();
    }

    fn epoch(&self) -> Epoch {
        self.inner.borrow().epoch()
    }

    fn is_still_live(&self, epoch: Epoch) -> bool {
        self.inner.borrow().is_still_live(epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Tag;

    #[test]
    fn buffer_merges_adjacent_glyphs() {
        let mut buf = MarkupBuffer::new();
        let p = buf.attach_child(buf.root(), &Shell::new(Tag::P));
        buf.append_char(p, "h");
        buf.append_char(p, "i");
        let b = buf.attach_child(p, &Shell::new(Tag::Strong));
        buf.append_char(b, "!");
        assert_eq!(buf.to_html(), "<p>hi<strong>!</strong></p>");
        assert_eq!(buf.writes(), 5);
    }

    #[test]
    fn empty_elements_are_closed() {
        let mut buf = MarkupBuffer::new();
        let ul = buf.attach_child(buf.root(), &Shell::new(Tag::Ul));
        buf.attach_child(ul, &Shell::new(Tag::Li));
        buf.attach_child(buf.root(), &Shell::new(Tag::Br));
        assert_eq!(buf.to_html(), "<ul><li></li></ul><br>");
    }

    #[test]
    fn clear_moves_to_next_epoch() {
        let mut buf = MarkupBuffer::new();
        let start = buf.epoch();
        let p = buf.attach_child(buf.root(), &Shell::new(Tag::P));
        buf.append_char(p, "x");
        buf.clear();
        assert_eq!(buf.to_html(), "");
        assert!(!buf.is_still_live(start));
        assert!(buf.is_still_live(start.next()));
    }

    #[test]
    fn shared_mount_sees_host_clear() {
        let host = SharedMount::new(MarkupBuffer::new());
        let reveal_side = host.clone();
        let epoch = reveal_side.epoch();
        host.detach();
        assert!(!reveal_side.is_still_live(epoch));
    }
}
