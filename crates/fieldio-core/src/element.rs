//! The reflection surface every addressable object exposes to the host.
//!
//! Devices, inputs and outputs are all elements: they have a name, child
//! elements, attributes, events and tasks. Observers discover state through
//! `for_each_*` enumeration and access it through handles; nothing outside a
//! driver ever sees the concrete types behind the trait object.

use std::sync::Arc;

use crate::attribute::{Attribute, ReadHandle, WriteHandle};
use crate::event::Event;
use crate::task::Task;

/// An addressable object in the element tree.
///
/// The `for_each_*` callbacks follow the same convention throughout: the
/// callback returns `true` to stop the iteration, and the method returns
/// whether it was stopped. Default implementations describe an element with
/// no children, no tasks and nothing writable, so leaf elements only
/// implement what they have.
pub trait Element: Send + Sync {
    /// The configured instance name.
    fn name(&self) -> &str;

    /// Iterates over the element's attributes until `f` returns `true`.
    fn for_each_attribute(&self, f: &mut dyn FnMut(Attribute) -> bool) -> bool;

    /// Iterates over the element's events until `f` returns `true`.
    fn for_each_event(&self, f: &mut dyn FnMut(&Event) -> bool) -> bool;

    /// Iterates over the element's schedulable tasks until `f` returns `true`.
    fn for_each_task(&self, f: &mut dyn FnMut(&Arc<dyn Task>) -> bool) -> bool {
        let _ = f;
        false
    }

    /// Iterates over the element's children until `f` returns `true`.
    fn for_each_child(&self, f: &mut dyn FnMut(&Arc<dyn Element>) -> bool) -> bool {
        let _ = f;
        false
    }

    /// Creates a read handle for an attribute, or `None` if the element does
    /// not have it.
    fn make_read_handle(&self, attribute: &Attribute) -> Option<ReadHandle>;

    /// Creates a write handle for an attribute, or `None` if the element has
    /// nothing writable under that name.
    fn make_write_handle(&self, attribute: &Attribute) -> Option<WriteHandle> {
        let _ = attribute;
        None
    }
}

/// Finds a direct child element by name.
pub fn find_child(element: &dyn Element, name: &str) -> Option<Arc<dyn Element>> {
    let mut found = None;
    element.for_each_child(&mut |child| {
        if child.name() == name {
            found = Some(Arc::clone(child));
            true
        } else {
            false
        }
    });
    found
}

/// Looks an attribute up by name across an element's attribute set.
pub fn find_attribute(element: &dyn Element, name: &str) -> Option<Attribute> {
    let mut found = None;
    element.for_each_attribute(&mut |attribute| {
        if attribute.name == name {
            found = Some(attribute);
            true
        } else {
            false
        }
    });
    found
}

/// Looks an event up by name and subscribes to it.
pub fn subscribe_event(
    element: &dyn Element,
    name: &str,
) -> Option<crate::event::EventSubscription> {
    let mut found = None;
    element.for_each_event(&mut |event| {
        if event.name() == name {
            found = Some(event.subscribe());
            true
        } else {
            false
        }
    });
    found
}
