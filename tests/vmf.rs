use vmf::{Angle, AttributeFlags, Color, Element, SerializationError, Serializer, Vector3, Vector4, serializer, serializer_for_extension};

fn parse(text: &str) -> Element {
    try_parse(text).unwrap()
}

fn try_parse(text: &str) -> Result<Element, SerializationError> {
    let serializer = serializer("vmf").unwrap();
    let mut reader = text.as_bytes();
    serializer.deserialize(&mut reader)
}

fn write(root: &Element) -> String {
    let serializer = serializer("vmf").unwrap();
    let mut buffer = Vec::new();
    serializer.serialize(&mut buffer, root).unwrap();
    String::from_utf8(buffer).unwrap()
}

fn entities_of(root: &Element) -> Vec<Element> {
    root.get_value::<Vec<Element>>("entities").unwrap().clone()
}

#[test]
fn registry_describes_the_vmf_format() {
    let serializer = serializer("vmf").unwrap();
    assert_eq!(serializer.name(), "vmf");
    assert_eq!(serializer.description(), "Valve Map File");
    assert_eq!(serializer.extension(), "vmf");
    assert_eq!(serializer.default_encoding(), "keyvalues");
    assert_eq!(serializer.current_version(), 0);

    assert!(serializer_for_extension("VMF").is_some());
    assert!(serializer_for_extension("dmx").is_none());
    assert!(vmf::serializer("actbusy").is_none());
}

#[test]
fn deserialize_builds_entity_graph() {
    let root = parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"5\"\n",
        "\t\"classname\" \"info_player_start\"\n",
        "\t\"origin\" \"1 2 3\"\n",
        "\t\"skin\" \"2\"\n",
        "\t\"scale\" \"1.5\"\n",
        "}\n"
    ));

    assert_eq!(root.get_name().as_str(), "VMF");
    assert_eq!(root.get_class().as_str(), "DmElement");

    let entities = entities_of(&root);
    assert_eq!(entities.len(), 1);

    let entity = &entities[0];
    assert_eq!(entity.get_name().as_str(), "5");
    assert_eq!(entity.get_class().as_str(), "DmeVMFEntity");
    assert_eq!(entity.get_value::<String>("classname").unwrap().as_str(), "info_player_start");
    assert_eq!(*entity.get_value::<Vector3>("origin").unwrap(), Vector3 { x: 1.0, y: 2.0, z: 3.0 });
    assert_eq!(*entity.get_value::<i32>("skin").unwrap(), 2);
    assert_eq!(*entity.get_value::<f32>("scale").unwrap(), 1.5);

    // File fields are free-form, not part of the entity schema.
    assert!(entity.attribute_flags("classname").intersects(AttributeFlags::USER_DEFINED));
    assert!(entity.attribute_flags("origin").intersects(AttributeFlags::USER_DEFINED));
    assert!(entity.attribute_flags("skin").intersects(AttributeFlags::USER_DEFINED));
    assert!(!entity.attribute_flags("editorType").intersects(AttributeFlags::USER_DEFINED));
}

#[test]
fn scalar_entity_fields_round_trip() {
    let source = concat!(
        "entity\n{\n",
        "\t\"id\" \"1\"\n",
        "\t\"classname\" \"logic_relay\"\n",
        "\t\"targetname\" \"relay\"\n",
        "\t\"skin\" \"2\"\n",
        "\t\"scale\" \"1.5\"\n",
        "}\n"
    );

    assert_eq!(write(&parse(source)), source);
}

#[test]
fn three_floats_become_vector_or_angle_by_key() {
    let root = parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"1\"\n",
        "\t\"classname\" \"info_target\"\n",
        "\t\"origin\" \"-16 0 64\"\n",
        "\t\"angles\" \"0 90 0\"\n",
        "}\n"
    ));

    let entity = &entities_of(&root)[0];
    assert_eq!(*entity.get_value::<Vector3>("origin").unwrap(), Vector3 { x: -16.0, y: 0.0, z: 64.0 });
    assert_eq!(*entity.get_value::<Angle>("angles").unwrap(), Angle { pitch: 0.0, yaw: 90.0, roll: 0.0 });
    assert!(entity.get_value::<Vector3>("angles").is_none());
}

#[test]
fn four_floats_become_a_vector4() {
    let root = parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"1\"\n",
        "\t\"classname\" \"light\"\n",
        "\t\"_light\" \"255 255 255 200\"\n",
        "}\n"
    ));

    let entity = &entities_of(&root)[0];
    assert_eq!(
        *entity.get_value::<Vector4>("_light").unwrap(),
        Vector4 {
            x: 255.0,
            y: 255.0,
            z: 255.0,
            w: 200.0
        }
    );
}

#[test]
fn two_floats_stay_a_string() {
    let root = parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"1\"\n",
        "\t\"classname\" \"info_target\"\n",
        "\t\"uv\" \"0.5 0.5\"\n",
        "}\n"
    ));

    let entity = &entities_of(&root)[0];
    assert_eq!(entity.get_value::<String>("uv").unwrap().as_str(), "0.5 0.5");
}

#[test]
fn entity_field_names_are_lower_cased() {
    let root = parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"1\"\n",
        "\t\"ClassName\" \"info_target\"\n",
        "\t\"TargetName\" \"spot\"\n",
        "}\n"
    ));

    let entity = &entities_of(&root)[0];
    assert!(entity.has_attribute("classname"));
    assert!(entity.has_attribute("targetname"));
    assert!(!entity.has_attribute("TargetName"));
}

#[test]
fn passthrough_fields_are_remapped_and_restored() {
    let source = concat!(
        "visgroups\n{\n",
        "\tvisgroup\n\t{\n",
        "\t\t\"name\" \"tricky\"\n",
        "\t\t\"visgroupid\" \"6\"\n",
        "\t\t\"color\" \"65 45 0\"\n",
        "\t}\n",
        "}\n"
    );

    let root = parse(source);
    let other = root.get_value::<Vec<Element>>("other").unwrap().clone();
    let visgroups = &other[0];
    let visgroup = visgroups.get_value::<Vec<Element>>("subkeys").unwrap()[0].clone();

    // Reserved field names are stored under their aliases...
    assert_eq!(visgroup.get_value::<String>("__name").unwrap().as_str(), "tricky");
    assert!(!visgroup.has_attribute("name"));
    assert_eq!(visgroup.get_value::<String>("visgroupid").unwrap().as_str(), "6");

    // ...and surface under their original names on the way out.
    assert_eq!(write(&root), source);
}

#[test]
fn max_id_tracks_the_largest_id_seen() {
    let root = parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"5\"\n",
        "\t\"classname\" \"info_target\"\n",
        "\teditor\n\t{\n",
        "\t\t\"id\" \"12\"\n",
        "\t}\n",
        "}\n",
        "entity\n{\n",
        "\t\"id\" \"3\"\n",
        "\t\"classname\" \"info_target\"\n",
        "}\n"
    ));

    assert_eq!(*root.get_value::<i32>("maxHammerId").unwrap(), 12);
}

#[test]
fn max_id_raises_with_each_new_entity() {
    let root = parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"5\"\n",
        "\t\"classname\" \"info_target\"\n",
        "}\n",
        "world\n{\n",
        "\t\"id\" \"12\"\n",
        "\t\"classname\" \"worldspawn\"\n",
        "}\n",
        "entity\n{\n",
        "\t\"id\" \"20\"\n",
        "\t\"classname\" \"info_target\"\n",
        "}\n"
    ));

    assert_eq!(*root.get_value::<i32>("maxHammerId").unwrap(), 20);
}

#[test]
fn other_blocks_are_filtered_and_reordered_around_entities() {
    let root = parse(concat!(
        "cordon\n{\n\t\"active\" \"0\"\n}\n",
        "custom\n{\n\t\"foo\" \"1\"\n}\n",
        "versioninfo\n{\n\t\"editorversion\" \"400\"\n}\n",
        "entity\n{\n\t\"id\" \"2\"\n\t\"classname\" \"info_target\"\n}\n",
        "world\n{\n\t\"id\" \"1\"\n\t\"classname\" \"worldspawn\"\n}\n"
    ));

    let expected = concat!(
        "versioninfo\n{\n\t\"editorversion\" \"400\"\n}\n",
        "world\n{\n\t\"id\" \"1\"\n\t\"classname\" \"worldspawn\"\n}\n",
        "entity\n{\n\t\"id\" \"2\"\n\t\"classname\" \"info_target\"\n}\n",
        "cordon\n{\n\t\"active\" \"0\"\n}\n"
    );

    assert_eq!(write(&root), expected);
}

#[test]
fn editor_block_fields_are_typed() {
    let root = parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"1\"\n",
        "\t\"classname\" \"info_target\"\n",
        "\teditor\n\t{\n",
        "\t\t\"color\" \"220 30 220\"\n",
        "\t\t\"comments\" \"spawn point\"\n",
        "\t\t\"visgroupshown\" \"1\"\n",
        "\t\t\"visgroupautoshown\" \"0\"\n",
        "\t\t\"logicals\" \"16000 16000\"\n",
        "\t}\n",
        "}\n"
    ));

    let entity = &entities_of(&root)[0];
    let editor = entity.get_value::<Option<Element>>("editor").unwrap().clone().unwrap();

    assert_eq!(
        *editor.get_value::<Color>("color").unwrap(),
        Color {
            r: 220,
            g: 30,
            b: 220,
            a: 255
        }
    );
    assert_eq!(editor.get_value::<String>("comments").unwrap().as_str(), "spawn point");
    assert!(*editor.get_value::<bool>("visgroupshown").unwrap());
    assert!(!*editor.get_value::<bool>("visgroupautoshown").unwrap());

    // Unrecognized editor fields pass through as strings.
    assert_eq!(editor.get_value::<String>("logicals").unwrap().as_str(), "16000 16000");
}

#[test]
fn editor_id_is_tracked_but_never_written() {
    let root = parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"1\"\n",
        "\t\"classname\" \"info_target\"\n",
        "\teditor\n\t{\n",
        "\t\t\"color\" \"0 180 0\"\n",
        "\t\t\"id\" \"40\"\n",
        "\t}\n",
        "}\n"
    ));

    assert_eq!(*root.get_value::<i32>("maxHammerId").unwrap(), 40);

    let entity = &entities_of(&root)[0];
    let editor = entity.get_value::<Option<Element>>("editor").unwrap().clone().unwrap();
    assert!(!editor.has_attribute("id"));

    // The editor body is indented twice; the entity's own id line once.
    let written = write(&root);
    assert!(written.contains("\t\"id\" \"1\"\n"));
    assert!(!written.contains("\t\t\"id\""));
}

#[test]
fn editor_is_written_last() {
    let root = parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"1\"\n",
        "\t\"classname\" \"func_detail\"\n",
        "\teditor\n\t{\n",
        "\t\t\"visgroupshown\" \"1\"\n",
        "\t}\n",
        "\tsolid\n\t{\n",
        "\t\t\"id\" \"2\"\n",
        "\t}\n",
        "}\n"
    ));

    let expected = concat!(
        "entity\n{\n",
        "\t\"id\" \"1\"\n",
        "\t\"classname\" \"func_detail\"\n",
        "\tsolid\n\t{\n",
        "\t\t\"id\" \"2\"\n",
        "\t}\n",
        "\teditor\n\t{\n",
        "\t\t\"visgroupshown\" \"1\"\n",
        "\t}\n",
        "}\n"
    );

    assert_eq!(write(&root), expected);
}

#[test]
fn empty_entity_field_fails_the_block() {
    let error = try_parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"1\"\n",
        "\t\"classname\" \"info_target\"\n",
        "\t\"targetname\" \"\"\n",
        "}\n"
    ))
    .unwrap_err();

    assert!(matches!(error, SerializationError::ImportFailed { block, .. } if block == "entity"));
}

#[test]
fn empty_editor_comments_are_omitted_not_fatal() {
    let root = parse(concat!(
        "entity\n{\n",
        "\t\"id\" \"1\"\n",
        "\t\"classname\" \"info_target\"\n",
        "\teditor\n\t{\n",
        "\t\t\"comments\" \"\"\n",
        "\t}\n",
        "}\n"
    ));

    let entity = &entities_of(&root)[0];
    let editor = entity.get_value::<Option<Element>>("editor").unwrap().clone().unwrap();
    assert!(!editor.has_attribute("comments"));
}

#[test]
fn missing_classname_fails_the_entity() {
    let error = try_parse("entity\n{\n\t\"id\" \"1\"\n}\n").unwrap_err();

    assert!(matches!(
        error,
        SerializationError::ImportFailed { ref block, ref source }
            if block == "entity" && matches!(**source, SerializationError::MissingField("classname"))
    ));
}

#[test]
fn entities_without_an_id_are_named_minus_one() {
    let root = parse("entity\n{\n\t\"classname\" \"info_target\"\n}\n");

    let entity = &entities_of(&root)[0];
    assert_eq!(entity.get_name().as_str(), "-1");
}

#[test]
fn load_simple_vmf() {
    let test_file_path = "tests/data/simple.vmf";

    let root = vmf::deserialize(test_file_path).unwrap();
    assert_eq!(*root.get_value::<i32>("maxHammerId").unwrap(), 5);
    assert_eq!(entities_of(&root).len(), 1);
    assert_eq!(root.get_value::<Vec<Element>>("other").unwrap().len(), 4);
}

#[test]
fn save_round_trips_simple_vmf() {
    let test_file_path = "tests/data/simple.vmf";

    let root = vmf::deserialize(test_file_path).unwrap();

    let output_directory = tempfile::tempdir().unwrap();
    let output_path = output_directory.path().join("roundtrip.vmf");
    vmf::serialize(&output_path, &root).unwrap();

    let original = std::fs::read_to_string(test_file_path).unwrap();
    let written = std::fs::read_to_string(&output_path).unwrap();
    assert_eq!(written, original);
}

#[test]
fn unknown_extension_fails_file_entry_points() {
    let error = vmf::deserialize("tests/data/simple.map").unwrap_err();
    assert!(matches!(error, SerializationError::UnknownFormat(extension) if extension == "map"));
}
