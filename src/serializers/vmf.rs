use std::io::{BufRead, Error as IoError, Write};

use log::warn;

use crate::{
    Angle, Attribute, AttributeFlags, Color, Element, Vector3, Vector4,
    keyvalues::{KeyValues, KeyValuesWriter, KvDataType},
    serializing::{SerializationError, Serializer},
};

use super::import::{
    add_bool_attribute, add_int_attribute, add_int_attribute_flags, add_float_attribute_flags, add_string_attribute, add_string_attribute_flags,
    print_bool_attribute, print_int_attribute, print_string_attribute,
};

/// Serializer for VMF files (map files).
///
/// A VMF is a sequence of top-level keyvalue blocks. `entity` blocks become
/// children of the root's `entities` array; every other block becomes a
/// passthrough child of the root's `other` array, with its fields preserved
/// verbatim as strings. The output block order is chosen to keep diffs
/// against the source file small.
pub struct VmfSerializer;

/// Field names that collide with the element graph's own reserved names are
/// stored under a leading-underscore alias.
const KEY_REMAP_NAMES: [[&str; 2]; 3] = [["id", "__id"], ["name", "__name"], ["type", "__type"]];

/// Maps a file field name to its stored attribute name.
fn remap_name_for_import(name: &str) -> &str {
    for [surface, stored] in KEY_REMAP_NAMES {
        if name.eq_ignore_ascii_case(surface) {
            return stored;
        }
    }
    name
}

/// Maps a stored attribute name back to its file field name.
fn remap_name_for_export(name: &str) -> &str {
    for [surface, stored] in KEY_REMAP_NAMES {
        if name.eq_ignore_ascii_case(stored) {
            return surface;
        }
    }
    name
}

/// Keys whose three-float values are angle triples rather than positions.
const ANGLE_FIELDS: [&str; 1] = ["angles"];

fn is_angle_field(name: &str) -> bool {
    ANGLE_FIELDS.iter().any(|field| field.eq_ignore_ascii_case(name))
}

const EDITOR_BUILTIN_FIELDS: [&str; 5] = ["color", "id", "comments", "visgroupshown", "visgroupautoshown"];

fn is_editor_builtin(name: &str) -> bool {
    EDITOR_BUILTIN_FIELDS.iter().any(|field| field.eq_ignore_ascii_case(name))
}

/// Splits field text into float components, or None if any component is not
/// a float.
fn parse_float_components(text: &str) -> Option<Vec<f32>> {
    text.split_whitespace().map(|component| component.parse::<f32>().ok()).collect()
}

/// Parses an editor color from `"r g b"` text; the alpha is implied.
fn parse_color(text: &str) -> Option<Color> {
    let mut components = text.split_whitespace();
    let r = components.next()?.parse().ok()?;
    let g = components.next()?.parse().ok()?;
    let b = components.next()?.parse().ok()?;
    if components.next().is_some() {
        return None;
    }
    Some(Color { r, g, b, a: 255 })
}

impl Serializer for VmfSerializer {
    fn name(&self) -> &'static str {
        "vmf"
    }

    fn description(&self) -> &'static str {
        "Valve Map File"
    }

    fn extension(&self) -> &'static str {
        "vmf"
    }

    fn default_encoding(&self) -> &'static str {
        "keyvalues"
    }

    // The format does not store a version.
    fn current_version(&self) -> i32 {
        0
    }

    fn serialize(&self, buffer: &mut dyn Write, root: &Element) -> Result<(), SerializationError> {
        // Other blocks are written in two filtered passes around the
        // entities to reproduce the block order Hammer writes; any other
        // child matching neither filter is dropped.
        const OTHER_FILTER_FIRST: [&str; 4] = ["versioninfo", "visgroups", "viewsettings", "world"];
        const OTHER_FILTER_LAST: [&str; 3] = ["cameras", "cordon", "hidden"];

        let mut writer = KeyValuesWriter::new(buffer);

        if let Some(other) = root.get_value::<Vec<Element>>("other") {
            write_other(&mut writer, other.as_slice(), Some(&OTHER_FILTER_FIRST))?;
        }

        if let Some(entities) = root.get_value::<Vec<Element>>("entities") {
            write_entities(&mut writer, entities.as_slice())?;
        }

        if let Some(other) = root.get_value::<Vec<Element>>("other") {
            write_other(&mut writer, other.as_slice(), Some(&OTHER_FILTER_LAST))?;
        }

        Ok(())
    }

    fn deserialize(&self, buffer: &mut dyn BufRead) -> Result<Element, SerializationError> {
        let mut buffer = buffer;
        let blocks = KeyValues::parse_blocks(&mut buffer)?;
        let mut importer = VmfImporter::default();

        let mut root = Element::create("VMF", "DmElement");

        // The root carries an editor type so it displays nicely in editors.
        root.set_value("editorType", String::from("VMF"));

        root.set_attribute("entities", Attribute::ElementArray(Vec::new()));
        root.set_attribute("other", Attribute::ElementArray(Vec::new()));

        for block in &blocks {
            let imported = if block.name().eq_ignore_ascii_case("entity") {
                importer.read_entity(&mut root, block)
            } else {
                let other = Element::create(block.name(), Element::DEFAULT_ELEMENT_CLASS);
                root.push_element("other", other.clone());
                importer.read_passthrough(other, block)
            };

            if let Err(error) = imported {
                warn!("error importing VMF element {}", block.name());
                return Err(SerializationError::ImportFailed {
                    block: block.name().to_string(),
                    source: Box::new(error),
                });
            }
        }

        root.set_value("maxHammerId", importer.max_hammer_id);

        Ok(root)
    }
}

/// Per-call import state.
#[derive(Default)]
struct VmfImporter {
    /// Largest numeric id seen anywhere in the file.
    max_hammer_id: i32,
}

impl VmfImporter {
    fn update_max_hammer_id(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("id") {
            if let Ok(id) = value.trim().parse::<i32>() {
                if id > self.max_hammer_id {
                    self.max_hammer_id = id;
                }
            }
        }
    }

    /// Reads a single entity block into a child of the root's entity array.
    fn read_entity(&mut self, root: &mut Element, keyvalues: &KeyValues) -> Result<(), SerializationError> {
        let mut entity = Element::create(keyvalues.get_or("id", "-1"), "DmeVMFEntity");
        root.push_element("entities", entity.clone());

        // Each entity carries an editor type so it displays nicely in editors.
        entity.set_value("editorType", String::from("vmfEntity"));

        if keyvalues.get("classname").is_none() {
            return Err(SerializationError::MissingField("classname"));
        }

        for (key, value) in keyvalues.values() {
            let field_name = key.to_ascii_lowercase();

            // id is the entity name, not a field; it only feeds the id
            // bookkeeping.
            if field_name == "id" {
                self.update_max_hammer_id(&field_name, value);
                continue;
            }

            debug_assert!(field_name != "type" && field_name != "name" && field_name != "editortype");

            match KvDataType::of(value) {
                KvDataType::Int => {
                    if !add_int_attribute_flags(&mut entity, keyvalues, &field_name, AttributeFlags::USER_DEFINED, None) {
                        return Err(SerializationError::InvalidFieldValue(field_name));
                    }
                }
                KvDataType::Float => {
                    if !add_float_attribute_flags(&mut entity, keyvalues, &field_name, AttributeFlags::USER_DEFINED, None) {
                        return Err(SerializationError::InvalidFieldValue(field_name));
                    }
                }
                KvDataType::Str => {
                    if value.is_empty() {
                        return Err(SerializationError::EmptyFieldValue(field_name));
                    }

                    // Look for vectors: four floats, then three, which are a
                    // position unless the key is schema-typed as angles.
                    match parse_float_components(value).as_deref() {
                        Some(&[x, y, z, w]) => {
                            entity.set_value(field_name.clone(), Vector4 { x, y, z, w });
                            entity.add_attribute_flags(&field_name, AttributeFlags::USER_DEFINED);
                        }
                        Some(&[x, y, z]) => {
                            if is_angle_field(&field_name) {
                                entity.set_value(field_name.clone(), Angle { pitch: x, yaw: y, roll: z });
                            } else {
                                entity.set_value(field_name.clone(), Vector3 { x, y, z });
                            }
                            entity.add_attribute_flags(&field_name, AttributeFlags::USER_DEFINED);
                        }
                        _ => {
                            if !add_string_attribute_flags(&mut entity, keyvalues, &field_name, AttributeFlags::USER_DEFINED, None) {
                                return Err(SerializationError::InvalidFieldValue(field_name));
                            }
                        }
                    }
                }
            }
        }

        entity.set_attribute("editor", Attribute::Element(None));
        entity.set_attribute("other", Attribute::ElementArray(Vec::new()));

        for sub_block in keyvalues.blocks() {
            if sub_block.name().eq_ignore_ascii_case("editor") {
                self.read_entity_editor(&mut entity, sub_block)?;
            } else {
                // Unrecognized subkeys are kept verbatim for round-tripping.
                let other = Element::create(sub_block.name(), Element::DEFAULT_ELEMENT_CLASS);
                entity.push_element("other", other.clone());
                self.read_passthrough(other, sub_block)?;
            }
        }

        Ok(())
    }

    /// Reads an entity's editor block, creating the editor element on the
    /// first one.
    fn read_entity_editor(&mut self, entity: &mut Element, keyvalues: &KeyValues) -> Result<(), SerializationError> {
        let existing = entity.get_value::<Option<Element>>("editor").and_then(|editor| editor.clone());
        let mut editor = match existing {
            Some(editor) => editor,
            None => {
                let editor = Element::create("editor", Element::DEFAULT_ELEMENT_CLASS);
                entity.set_attribute("editor", Attribute::Element(Some(editor.clone())));
                editor
            }
        };

        if let Some(color) = parse_color(keyvalues.get_or("color", "")) {
            editor.set_value("color", color);
        }

        if let Some(id) = keyvalues.get("id") {
            self.update_max_hammer_id("id", id);
        }

        // id is a reserved attribute name, so this records nothing on the
        // editor element itself.
        add_int_attribute(&mut editor, keyvalues, "id", None);
        add_string_attribute(&mut editor, keyvalues, "comments", None);
        add_bool_attribute(&mut editor, keyvalues, "visgroupshown", None);
        add_bool_attribute(&mut editor, keyvalues, "visgroupautoshown", None);

        for (key, _) in keyvalues.values() {
            if !is_editor_builtin(key) {
                add_string_attribute(&mut editor, keyvalues, key, None);
            }
        }

        Ok(())
    }

    /// Reads a block the importer knows nothing about; every field is stored
    /// verbatim as a string and nested blocks recurse into a `subkeys` array.
    fn read_passthrough(&mut self, mut element: Element, keyvalues: &KeyValues) -> Result<(), SerializationError> {
        for (key, value) in keyvalues.values() {
            self.update_max_hammer_id(key, value);
            let field_name = remap_name_for_import(key);
            element.set_value(field_name.to_string(), value.to_string());
        }

        element.set_attribute("subkeys", Attribute::ElementArray(Vec::new()));
        for sub_block in keyvalues.blocks() {
            let sub_element = Element::create(sub_block.name(), Element::DEFAULT_ELEMENT_CLASS);
            element.push_element("subkeys", sub_element.clone());
            self.read_passthrough(sub_element, sub_block)?;
        }

        Ok(())
    }
}

/// Writes one attribute as a field line, or recurses into an element array
/// as nested blocks when `element_arrays` is set.
fn write_attribute<T: Write>(writer: &mut KeyValuesWriter<T>, name: &str, attribute: &Attribute, flags: AttributeFlags, element_arrays: bool) -> Result<(), IoError> {
    if flags.intersects(AttributeFlags::STANDARD | AttributeFlags::DONT_SAVE) {
        return Ok(());
    }

    let field_name = remap_name_for_export(name);
    if field_name.eq_ignore_ascii_case("editorType") {
        return Ok(());
    }

    if attribute.is_array() {
        if element_arrays {
            if let Attribute::ElementArray(values) = attribute {
                write_other(writer, values, None)?;
            }
        }
        return Ok(());
    }

    if element_arrays {
        return Ok(());
    }

    let value = match attribute {
        Attribute::Integer(value) => value.to_string(),
        Attribute::Float(value) => value.to_string(),
        Attribute::Boolean(value) => (*value as u8).to_string(),
        Attribute::String(value) => value.clone(),
        Attribute::Color(value) => value.to_string(),
        Attribute::Vector3(value) => value.to_string(),
        Attribute::Vector4(value) => value.to_string(),
        Attribute::Angle(value) => value.to_string(),
        Attribute::Matrix(value) => value.to_string(),
        Attribute::Element(_) | Attribute::ElementArray(_) => {
            debug_assert!(false, "element reference {field_name} cannot be written as a field");
            return Ok(());
        }
    };

    writer.keyvalue(field_name, &value)
}

/// Writes an array of generic elements as blocks, optionally filtered by
/// element name. Field lines come first, nested element arrays after.
fn write_other<T: Write>(writer: &mut KeyValuesWriter<T>, elements: &[Element], filter: Option<&[&str]>) -> Result<(), IoError> {
    for element in elements {
        let element_name = element.get_name();
        if let Some(filter) = filter {
            if !filter.iter().any(|allowed| allowed.eq_ignore_ascii_case(element_name.as_str())) {
                continue;
            }
        }

        writer.begin_block(&element_name.to_ascii_lowercase())?;

        for (name, (attribute, attribute_flags)) in element.get_attributes().iter() {
            write_attribute(writer, name, attribute, *attribute_flags, false)?;
        }

        for (name, (attribute, attribute_flags)) in element.get_attributes().iter() {
            write_attribute(writer, name, attribute, *attribute_flags, true)?;
        }

        writer.end_block()?;
    }

    Ok(())
}

/// Writes every entity as an `entity` block, with the editor block last so
/// edits elsewhere in the entity do not reorder it.
fn write_entities<T: Write>(writer: &mut KeyValuesWriter<T>, entities: &[Element]) -> Result<(), IoError> {
    for entity in entities {
        writer.begin_block("entity")?;
        writer.keyvalue("id", entity.get_name().as_str())?;

        for (name, (attribute, attribute_flags)) in entity.get_attributes().iter() {
            if name.eq_ignore_ascii_case("editor") {
                continue;
            }
            write_attribute(writer, name, attribute, *attribute_flags, false)?;
        }

        for (name, (attribute, attribute_flags)) in entity.get_attributes().iter() {
            if name.eq_ignore_ascii_case("editor") {
                continue;
            }
            write_attribute(writer, name, attribute, *attribute_flags, true)?;
        }

        if let Some(editor) = entity.get_value::<Option<Element>>("editor") {
            if let Some(editor) = editor.as_ref() {
                write_entity_editor(writer, editor)?;
            }
        }

        writer.end_block()?;
    }

    Ok(())
}

fn write_entity_editor<T: Write>(writer: &mut KeyValuesWriter<T>, editor: &Element) -> Result<(), IoError> {
    writer.begin_block("editor")?;

    if let Some(color) = editor.get_value::<Color>("color") {
        writer.keyvalue("color", &format!("{} {} {}", color.r, color.g, color.b))?;
    }

    // id never lands as an attribute (reserved name), so this writes
    // nothing; the call keeps the fixed field order in one place.
    print_int_attribute(editor, writer, "id")?;
    print_string_attribute(editor, writer, "comments")?;
    print_bool_attribute(editor, writer, "visgroupshown")?;
    print_bool_attribute(editor, writer, "visgroupautoshown")?;

    for (name, (_, attribute_flags)) in editor.get_attributes().iter() {
        if attribute_flags.intersects(AttributeFlags::STANDARD | AttributeFlags::DONT_SAVE) {
            continue;
        }

        if !is_editor_builtin(name) {
            print_string_attribute(editor, writer, name)?;
        }
    }

    writer.end_block()
}
