use vmf::keyvalues::{KeyValues, KeyValuesError, KeyValuesWriter, KvDataType};

fn parse(text: &str) -> Vec<KeyValues> {
    let mut reader = text.as_bytes();
    KeyValues::parse_blocks(&mut reader).unwrap()
}

#[test]
fn parses_nested_blocks() {
    let blocks = parse(
        "world\n{\n\t\"id\" \"1\"\n\t\"classname\" \"worldspawn\"\n\tsolid\n\t{\n\t\t\"id\" \"2\"\n\t}\n}\ncameras\n{\n}\n",
    );

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].name(), "world");
    assert_eq!(blocks[1].name(), "cameras");

    let fields: Vec<(&str, &str)> = blocks[0].values().collect();
    assert_eq!(fields, vec![("id", "1"), ("classname", "worldspawn")]);

    let sub_blocks: Vec<&KeyValues> = blocks[0].blocks().collect();
    assert_eq!(sub_blocks.len(), 1);
    assert_eq!(sub_blocks[0].name(), "solid");
    assert_eq!(sub_blocks[0].get("id"), Some("2"));
}

#[test]
fn skips_line_comments() {
    let blocks = parse("// header comment\nworld\n{\n\t// field comment\n\t\"classname\" \"worldspawn\"\n}\n");

    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].get("classname"), Some("worldspawn"));
}

#[test]
fn reads_escaped_characters() {
    let blocks = parse("notes\n{\n\t\"message\" \"a \\\"quoted\\\" word and a \\\\ slash\"\n}\n");

    assert_eq!(blocks[0].get("message"), Some("a \"quoted\" word and a \\ slash"));
}

#[test]
fn reads_bare_words() {
    let blocks = parse("world { classname worldspawn }");

    assert_eq!(blocks[0].name(), "world");
    assert_eq!(blocks[0].get("classname"), Some("worldspawn"));
}

#[test]
fn lookup_is_case_insensitive() {
    let blocks = parse("world\n{\n\t\"ClassName\" \"worldspawn\"\n}\n");

    assert_eq!(blocks[0].get("classname"), Some("worldspawn"));
    assert_eq!(blocks[0].get_or("missing", "fallback"), "fallback");
}

#[test]
fn classifies_field_text() {
    assert_eq!(KvDataType::of("12"), KvDataType::Int);
    assert_eq!(KvDataType::of("-5"), KvDataType::Int);
    assert_eq!(KvDataType::of("+3"), KvDataType::Int);
    assert_eq!(KvDataType::of("1.5"), KvDataType::Float);
    assert_eq!(KvDataType::of("-0.25"), KvDataType::Float);
    assert_eq!(KvDataType::of(".5"), KvDataType::Float);
    assert_eq!(KvDataType::of("1.5e3"), KvDataType::Float);
    assert_eq!(KvDataType::of(""), KvDataType::Str);
    assert_eq!(KvDataType::of("worldspawn"), KvDataType::Str);
    assert_eq!(KvDataType::of("1 2 3"), KvDataType::Str);
}

#[test]
fn unclosed_block_fails() {
    let mut reader = "world\n{\n\t\"id\" \"1\"\n".as_bytes();
    let error = KeyValues::parse_blocks(&mut reader).unwrap_err();

    assert!(matches!(error, KeyValuesError::UnclosedBlock(name) if name == "world"));
}

#[test]
fn stray_close_brace_fails() {
    let mut reader = "}\n".as_bytes();
    let error = KeyValues::parse_blocks(&mut reader).unwrap_err();

    assert!(matches!(error, KeyValuesError::InvalidToken(1)));
}

#[test]
fn writer_emits_indented_blocks() {
    let mut buffer = Vec::new();
    let mut writer = KeyValuesWriter::new(&mut buffer);

    writer.begin_block("world").unwrap();
    writer.keyvalue("classname", "worldspawn").unwrap();
    writer.begin_block("solid").unwrap();
    writer.keyvalue("id", "2").unwrap();
    writer.end_block().unwrap();
    writer.end_block().unwrap();

    let written = String::from_utf8(buffer).unwrap();
    assert_eq!(written, "world\n{\n\t\"classname\" \"worldspawn\"\n\tsolid\n\t{\n\t\t\"id\" \"2\"\n\t}\n}\n");
}
