//! Byte-level checks of finished chunks.

mod common;

use common::{
    fixed_recording, read_checkpoint, read_header, read_metadata, records, Cursor, START_NANOS,
};
use flr_writer::chunk::constants::{
    CHECKPOINT_EVENT_ID, CHECKPOINT_FLUSH, HEADER_SIZE, METADATA_EVENT_ID, VERSION,
};
use flr_writer::{jdk, Builtin, ErrorKind, Recording, RecordingError, Type};

/// Registers `http.Request` and `my.RequestEvent`, both with `url` and
/// `status` fields.
fn register_request_types(recording: &Recording) -> (Type, Type) {
    let request = recording
        .register_type("http.Request", None, |b| {
            b.add_field("url", Builtin::String)
                .add_field("status", Builtin::Int);
            Ok(())
        })
        .unwrap();
    let event = recording
        .register_event_type("my.RequestEvent", |b| {
            b.add_field("url", Builtin::String)
                .add_field("status", Builtin::Int)
                .add_field("request", "http.Request");
            Ok(())
        })
        .unwrap();
    (request, event)
}

fn request_chunk() -> (Recording, Type, Type, Vec<u8>) {
    let mut recording = fixed_recording();
    let (request, event) = register_request_types(&recording);
    let value = recording
        .types()
        .as_value_with(&event, |b| {
            b.put("url", "/x")?.put("status", 200i32)?;
            Ok(())
        })
        .unwrap();
    recording.write_event(&value).unwrap();
    let bytes = recording.finish_chunk().unwrap();
    (recording, request, event, bytes)
}

#[test]
fn test_request_event_chunk_header() {
    let (_, _, _, bytes) = request_chunk();
    let header = read_header(&bytes);

    assert_eq!(&header.magic, b"FLR\0");
    assert_eq!(header.major, VERSION.major);
    assert_eq!(header.minor, VERSION.minor);
    assert_eq!(header.size as usize, bytes.len());
    assert_eq!(header.start_nanos, START_NANOS);
    assert_eq!(header.start_ticks, 0);
    assert_eq!(header.ticks_per_second, 1_000_000_000);
    assert_eq!(header.features, 1);
    // pinned start ticks do not leak into the measured duration
    assert!((0..header.ticks_per_second).contains(&header.duration));

    let cp = header.constant_pool_offset as usize;
    let meta = header.metadata_offset as usize;
    assert!(cp > HEADER_SIZE && cp < bytes.len());
    assert!(meta > cp && meta < bytes.len());

    let mut cursor = Cursor::new(&bytes, cp);
    cursor.varint();
    assert_eq!(cursor.varint(), CHECKPOINT_EVENT_ID);
    let mut cursor = Cursor::new(&bytes, meta);
    cursor.varint();
    assert_eq!(cursor.varint(), METADATA_EVENT_ID);
}

#[test]
fn test_records_are_event_checkpoint_metadata() {
    let (_, _, event, bytes) = request_chunk();
    let header = read_header(&bytes);
    let records = records(&bytes);

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].offset, HEADER_SIZE);
    assert_eq!(records[0].type_id, event.id().unwrap().as_i64());
    assert_eq!(records[1].offset as i64, header.constant_pool_offset);
    assert_eq!(records[1].type_id, CHECKPOINT_EVENT_ID);
    assert_eq!(records[2].offset as i64, header.metadata_offset);
    assert_eq!(records[2].type_id, METADATA_EVENT_ID);
}

#[test]
fn test_event_body() {
    let (_, _, _, bytes) = request_chunk();
    let event = records(&bytes)[0];
    let mut cursor = Cursor::new(&bytes, event.body);

    // startTime, eventThread, stackTrace left unset
    assert_eq!(cursor.varint(), 0);
    assert_eq!(cursor.varint(), 0);
    assert_eq!(cursor.varint(), 0);
    assert_eq!(cursor.string().as_deref(), Some("/x"));
    assert_eq!(cursor.varint(), 200);
    // null request
    assert_eq!(cursor.varint(), 0);
    assert_eq!(cursor.pos, event.offset + event.size);
}

#[test]
fn test_metadata_describes_types() {
    let (recording, request, event, bytes) = request_chunk();
    let header = read_header(&bytes);
    let metadata = read_metadata(&bytes, header.metadata_offset as usize);

    assert_eq!(metadata.strings[0], "1");
    assert_eq!(metadata.strings[1], "class");
    let top: Vec<&str> = metadata.root.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(top, ["metadata", "region"]);
    assert_eq!(metadata.root.name, "root");

    let classes = metadata.classes();
    let types = recording.types();
    let total = types.with_metadata(|m| m.len());
    assert_eq!(classes.len(), total);

    let event_class = &classes["my.RequestEvent"];
    assert_eq!(event_class.attr("id"), Some(event.id().unwrap().to_string().as_str()));
    assert_eq!(event_class.attr("superType"), Some("jdk.jfr.Event"));
    assert_eq!(event_class.attr("simpleType"), None);
    let fields: Vec<&str> = event_class
        .child_named("field")
        .map(|f| f.attr("name").unwrap())
        .collect();
    assert_eq!(
        fields,
        ["startTime", "eventThread", "stackTrace", "url", "status", "request"]
    );

    let field = |name: &str| {
        event_class
            .child_named("field")
            .find(|f| f.attr("name") == Some(name))
            .unwrap()
            .clone()
    };
    let string_id = types.builtin(Builtin::String).id().unwrap().to_string();
    assert_eq!(field("url").attr("class"), Some(string_id.as_str()));
    assert_eq!(field("url").attr("constantPool"), None);
    assert_eq!(field("eventThread").attr("constantPool"), Some("true"));
    assert_eq!(
        field("request").attr("class"),
        Some(request.id().unwrap().to_string().as_str())
    );

    let start_time = field("startTime");
    let annotation = start_time.child_named("annotation").next().unwrap();
    let timestamp = types.get_type(jdk::ANNOTATION_TIMESTAMP, false).unwrap();
    assert_eq!(
        annotation.attr("class"),
        Some(timestamp.id().unwrap().to_string().as_str())
    );
    assert_eq!(annotation.attr("value"), Some("TICKS"));

    let trace = &classes[jdk::STACK_TRACE];
    let frames = trace
        .child_named("field")
        .find(|f| f.attr("name") == Some("frames"))
        .unwrap();
    assert_eq!(frames.attr("dimension"), Some("1"));
    assert_eq!(frames.attr("constantPool"), Some("true"));

    assert_eq!(classes[jdk::TICKS].attr("simpleType"), Some("true"));
    assert_eq!(classes["int"].children.len(), 0);
    assert_eq!(classes["java.lang.String"].attr("superType"), None);
}

#[test]
fn test_checkpoint_pools() {
    let mut recording = fixed_recording();
    let (request, event) = register_request_types(&recording);
    let types = recording.types().clone();
    let value = types
        .as_value_with(&event, |b| {
            b.put("url", "/x")?
                .put("status", 200i32)?
                .put_with("request", |r| {
                    r.put("url", "/x")?.put("status", 404i32)?;
                    Ok(())
                })?;
            Ok(())
        })
        .unwrap();
    recording.write_event(&value).unwrap();
    let bytes = recording.finish_chunk().unwrap();
    let header = read_header(&bytes);

    let checkpoint = read_checkpoint(&bytes, header.constant_pool_offset as usize);
    assert_eq!(checkpoint.start_ticks, 0);
    assert_eq!(checkpoint.delta, 0);
    assert_eq!(checkpoint.type_mask, CHECKPOINT_FLUSH);
    assert_eq!(checkpoint.pool_count, 2);

    let mut cursor = Cursor::new(&bytes, checkpoint.pools_start);
    // the string pool comes first because the request pool refers to it
    assert_eq!(cursor.varint(), types.builtin(Builtin::String).id().unwrap().as_i64());
    assert_eq!(cursor.count(), 1);
    assert_eq!(cursor.varint(), 1);
    assert_eq!(cursor.string().as_deref(), Some("/x"));

    assert_eq!(cursor.varint(), request.id().unwrap().as_i64());
    assert_eq!(cursor.count(), 1);
    assert_eq!(cursor.varint(), 1);
    assert_eq!(cursor.string().as_deref(), Some("#1"));
    assert_eq!(cursor.varint(), 404);
    assert_eq!(
        cursor.pos,
        header.constant_pool_offset as usize + checkpoint.size
    );

    // the event refers to the request by index
    let event_record = records(&bytes)[0];
    let mut cursor = Cursor::new(&bytes, event_record.body);
    for _ in 0..3 {
        cursor.varint();
    }
    assert_eq!(cursor.string().as_deref(), Some("/x"));
    assert_eq!(cursor.varint(), 200);
    assert_eq!(cursor.varint(), 1);
}

#[test]
fn test_each_chunk_is_self_contained() {
    let (mut recording, _, event, first) = request_chunk();
    let second = recording.finish_chunk().unwrap();

    let first_cp = read_checkpoint(&first, read_header(&first).constant_pool_offset as usize);
    let second_cp = read_checkpoint(&second, read_header(&second).constant_pool_offset as usize);
    // pools outlive the chunk that filled them
    assert_eq!(first_cp.pool_count, second_cp.pool_count);
    assert!(first_cp.pool_count > 0);

    let second_meta = read_metadata(&second, read_header(&second).metadata_offset as usize);
    assert!(second_meta.classes().contains_key(event.name()));
    assert_eq!(records(&second).len(), 2);
}

#[test]
fn test_large_event_uses_wider_size_prefix() {
    let mut recording = fixed_recording();
    let (_, event) = register_request_types(&recording);
    let url = "/".repeat(300);
    let value = recording
        .types()
        .as_value_with(&event, |b| b.put("url", url.as_str()).map(|_| ()))
        .unwrap();
    recording.write_event(&value).unwrap();
    let bytes = recording.finish_chunk().unwrap();

    let event_record = records(&bytes)[0];
    assert!(event_record.size > 300);
    // two-byte size prefix followed by a one-byte type id
    assert_eq!(event_record.body, HEADER_SIZE + 3);
    let mut cursor = Cursor::new(&bytes, event_record.body);
    for _ in 0..3 {
        cursor.varint();
    }
    assert_eq!(cursor.string(), Some(url));
}

#[test]
fn test_event_cycle_through_unset_fields_is_rejected() {
    let mut recording = fixed_recording();
    let ping = recording
        .register_event_type("x.Ping", |b| {
            b.add_field("seq", Builtin::Int).add_field("pong", "x.Pong");
            Ok(())
        })
        .unwrap();
    recording
        .register_event_type("x.Pong", |b| {
            b.add_field("ping", "x.Ping");
            Ok(())
        })
        .unwrap();
    recording.begin_chunk().unwrap();

    let value = recording
        .types()
        .as_value_with(&ping, |b| b.put("seq", 1i32).map(|_| ()))
        .unwrap();
    let err = recording.write_event(&value).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(
        err,
        RecordingError::RecursiveInlineType {
            type_name: "x.Pong".into()
        }
    );

    // the rejected event left nothing behind
    let bytes = recording.finish_chunk().unwrap();
    assert_eq!(records(&bytes).len(), 2);
    let metadata = read_metadata(&bytes, read_header(&bytes).metadata_offset as usize);
    assert!(metadata.classes().contains_key("x.Pong"));
}

#[test]
fn test_self_referencing_event_through_array() {
    let mut recording = fixed_recording();
    let span = recording
        .register_event_type("x.Span", |b| {
            let me = b.self_type();
            b.add_field("name", Builtin::String)
                .add_field_with("children", me, |f| {
                    f.as_array();
                    Ok(())
                })?;
            Ok(())
        })
        .unwrap();
    let types = recording.types().clone();
    let child = types
        .as_value_with(&span, |b| b.put("name", "db").map(|_| ()))
        .unwrap();
    let root = types
        .as_value_with(&span, |b| {
            b.put("name", "http")?.put_values("children", vec![child])?;
            Ok(())
        })
        .unwrap();
    recording.write_event(&root).unwrap();
    let bytes = recording.finish_chunk().unwrap();

    let event = records(&bytes)[0];
    assert_eq!(event.type_id, span.id().unwrap().as_i64());
    let mut cursor = Cursor::new(&bytes, event.body);
    for _ in 0..3 {
        cursor.varint();
    }
    assert_eq!(cursor.string().as_deref(), Some("http"));
    assert_eq!(cursor.count(), 1);
    // the child carries its own implicit fields
    for _ in 0..3 {
        cursor.varint();
    }
    assert_eq!(cursor.string().as_deref(), Some("db"));
    assert_eq!(cursor.count(), 0);
    assert_eq!(cursor.pos, event.offset + event.size);
}
