use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use indexmap::IndexMap;
use uuid::Uuid as UUID;

use crate::{Attribute, AttributeFlags};

/// The element struct represents a single node in the element graph.
///
/// It contains a name, a class, and an ordered set of attributes; each
/// attribute carries a value and a set of [AttributeFlags].
///
/// Elements are reference counted, so references to the same element can be
/// held by multiple attributes of the same graph.
#[derive(Clone, Debug)]
pub struct Element(Rc<RefCell<ElementData>>);

impl Default for Element {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(ElementData {
            name: String::from(Self::DEFAULT_ELEMENT_NAME),
            class: String::from(Self::DEFAULT_ELEMENT_CLASS),
            id: UUID::new_v4(),
            attributes: IndexMap::new(),
        })))
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.0.borrow().id == other.0.borrow().id
    }
}

impl Eq for Element {}

impl std::hash::Hash for Element {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.borrow().id.hash(state);
    }
}

impl Element {
    pub const DEFAULT_ELEMENT_NAME: &str = "unnamed";
    pub const DEFAULT_ELEMENT_CLASS: &str = "DmElement";

    /// Creates a new element with the given name and class.
    pub fn create(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(ElementData {
            name: name.into(),
            class: class.into(),
            id: UUID::new_v4(),
            attributes: IndexMap::new(),
        })))
    }

    /// Creates a new element of the default class with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(ElementData {
            name: name.into(),
            class: String::from(Self::DEFAULT_ELEMENT_CLASS),
            id: UUID::new_v4(),
            attributes: IndexMap::new(),
        })))
    }

    /// Returns the name of the element.
    pub fn get_name(&self) -> Ref<String> {
        let element_data = self.0.borrow();
        Ref::map(element_data, |element| &element.name)
    }

    /// Sets the name of the element.
    pub fn set_name(&self, name: impl Into<String>) {
        let mut element_data = self.0.borrow_mut();
        element_data.name = name.into();
    }

    /// Returns the class of the element.
    pub fn get_class(&self) -> Ref<String> {
        let element_data = self.0.borrow();
        Ref::map(element_data, |element| &element.class)
    }

    /// Sets the class of the element.
    pub fn set_class(&self, class: impl Into<String>) {
        let mut element_data = self.0.borrow_mut();
        element_data.class = class.into();
    }

    /// Returns the [UUID] of the element.
    pub fn get_id(&self) -> Ref<UUID> {
        let element_data = self.0.borrow();
        Ref::map(element_data, |element: &ElementData| &element.id)
    }

    /// Returns the attribute with the given name. If the attribute does not exist, returns None.
    pub fn get_attribute(&self, name: impl AsRef<str>) -> Option<Ref<Attribute>> {
        let element_data = self.0.borrow();
        let attribute_name = name.as_ref();
        Ref::filter_map(element_data, |element| element.attributes.get(attribute_name).map(|(attribute, _)| attribute)).ok()
    }

    /// Returns true if the element has an attribute with the given name.
    pub fn has_attribute(&self, name: impl AsRef<str>) -> bool {
        self.0.borrow().attributes.contains_key(name.as_ref())
    }

    /// Sets the attribute with the given name, preserving any flags already set on it.
    ///
    /// `id` and `name` are reserved names and are rejected.
    pub fn set_attribute(&mut self, name: impl Into<String>, attribute: Attribute) -> Option<Attribute> {
        let mut element_data = self.0.borrow_mut();
        let attribute_name = name.into();

        if attribute_name.eq("name") || attribute_name.eq("id") {
            return None;
        }

        match element_data.attributes.entry(attribute_name) {
            indexmap::map::Entry::Occupied(mut occupied_entry) => {
                let flags = occupied_entry.get().1;
                let (old_attribute, _) = occupied_entry.insert((attribute, flags));
                Some(old_attribute)
            }
            indexmap::map::Entry::Vacant(vacant_entry) => {
                vacant_entry.insert((attribute, AttributeFlags::default()));
                None
            }
        }
    }

    /// Removes the attribute with the given name and returns it. If the attribute does not exist, returns None.
    pub fn remove_attribute(&mut self, name: impl AsRef<str>) -> Option<Attribute> {
        let mut element_data = self.0.borrow_mut();
        let attribute_name = name.as_ref();
        element_data.attributes.shift_remove(attribute_name).map(|(attribute, _)| attribute)
    }

    /// Returns the value of the attribute with the given name. If the attribute does not exist or is not the same type, returns None.
    pub fn get_value<V>(&self, name: impl AsRef<str>) -> Option<Ref<V>>
    where
        for<'a> &'a V: TryFrom<&'a Attribute>,
    {
        let element_attribute = self.get_attribute(name)?;
        Ref::filter_map(element_attribute, |attribute| attribute.try_into().ok()).ok()
    }

    /// Sets the value of the attribute with the given name. If there was a value with the same type then its returned.
    pub fn set_value<V>(&mut self, name: impl Into<String>, value: V) -> Option<V>
    where
        V: Into<Attribute> + TryFrom<Attribute>,
    {
        self.set_attribute(name, value.into()).and_then(|attribute| attribute.try_into().ok())
    }

    /// Appends an element to the element array attribute with the given name,
    /// creating an empty array first if the attribute does not exist.
    ///
    /// Returns false if the attribute exists but is not an element array.
    pub fn push_element(&mut self, name: impl Into<String>, element: Element) -> bool {
        let mut element_data = self.0.borrow_mut();
        let attribute_name = name.into();

        if attribute_name.eq("name") || attribute_name.eq("id") {
            return false;
        }

        let (attribute, _) = element_data
            .attributes
            .entry(attribute_name)
            .or_insert((Attribute::ElementArray(Vec::new()), AttributeFlags::default()));

        match attribute {
            Attribute::ElementArray(values) => {
                values.push(element);
                true
            }
            _ => false,
        }
    }

    /// Returns the flags of the attribute with the given name, or the empty set if the attribute does not exist.
    pub fn attribute_flags(&self, name: impl AsRef<str>) -> AttributeFlags {
        let element_data = self.0.borrow();
        element_data.attributes.get(name.as_ref()).map(|(_, flags)| *flags).unwrap_or_default()
    }

    /// Adds flags to the attribute with the given name. Returns false if the attribute does not exist.
    pub fn add_attribute_flags(&mut self, name: impl AsRef<str>, flags: AttributeFlags) -> bool {
        let mut element_data = self.0.borrow_mut();
        match element_data.attributes.get_mut(name.as_ref()) {
            Some((_, attribute_flags)) => {
                attribute_flags.insert(flags);
                true
            }
            None => false,
        }
    }

    /// Returns the attributes of the element with their flags, in insertion order.
    pub fn get_attributes(&self) -> Ref<IndexMap<String, (Attribute, AttributeFlags)>> {
        let element_data = self.0.borrow();
        Ref::map(element_data, |element| &element.attributes)
    }
}

#[derive(Debug)]
struct ElementData {
    name: String,
    class: String,
    id: UUID,
    attributes: IndexMap<String, (Attribute, AttributeFlags)>,
}
