//! The JDK type catalog every recording starts with.
//!
//! Readers expect these names and field layouts; event types reference the
//! thread and stack trace types implicitly.

use super::{Builtin, Types, ANNOTATION_SUPER_TYPE};
use crate::error::Result;

pub const TICKSPAN: &str = "jdk.type.Tickspan";
pub const TICKS: &str = "jdk.type.Ticks";
pub const THREAD_GROUP: &str = "jdk.types.ThreadGroup";
pub const THREAD: &str = "java.lang.Thread";
pub const STACK_TRACE: &str = "jdk.types.StackTrace";
pub const STACK_FRAME: &str = "jdk.types.StackFrame";
pub const METHOD: &str = "jdk.types.Method";
pub const FRAME_TYPE: &str = "jdk.types.FrameType";
pub const CLASS: &str = "java.lang.Class";
pub const SYMBOL: &str = "jdk.types.Symbol";
pub const CLASS_LOADER: &str = "jdk.types.ClassLoader";
pub const PACKAGE: &str = "jdk.types.Package";
pub const MODULE: &str = "jdk.types.Module";

pub const ANNOTATION_NAME: &str = "jdk.jfr.Name";
pub const ANNOTATION_LABEL: &str = "jdk.jfr.Label";
pub const ANNOTATION_DESCRIPTION: &str = "jdk.jfr.Description";
pub const ANNOTATION_CONTENT_TYPE: &str = "jdk.jfr.ContentType";
pub const ANNOTATION_TIMESTAMP: &str = "jdk.jfr.Timestamp";
pub const ANNOTATION_TIMESPAN: &str = "jdk.jfr.Timespan";
pub const ANNOTATION_UNSIGNED: &str = "jdk.jfr.Unsigned";

/// Value of the timestamp annotation on event start times.
pub const TICKS_UNIT: &str = "TICKS";

/// Register the catalog and resolve its internal forward references.
pub(crate) fn register(types: &Types) -> Result<()> {
    register_annotations(types)?;
    register_data_types(types)?;
    types.resolve_all();
    Ok(())
}

fn register_annotations(types: &Types) -> Result<()> {
    for name in [ANNOTATION_NAME, ANNOTATION_LABEL, ANNOTATION_DESCRIPTION] {
        types.get_or_add(name, Some(ANNOTATION_SUPER_TYPE), |b| {
            b.add_field("value", Builtin::String);
            Ok(())
        })?;
    }
    types.get_or_add(ANNOTATION_CONTENT_TYPE, Some(ANNOTATION_SUPER_TYPE), |_| Ok(()))?;

    let content_annotations = [
        (
            ANNOTATION_TIMESTAMP,
            "Timestamp",
            "A point in time",
        ),
        (
            ANNOTATION_TIMESPAN,
            "Timespan",
            "A duration, measured in nanoseconds by default",
        ),
        (
            ANNOTATION_UNSIGNED,
            "Unsigned value",
            "Value should be interpreted as unsigned data type",
        ),
    ];
    for (name, label, description) in content_annotations {
        types.get_or_add(name, Some(ANNOTATION_SUPER_TYPE), |b| {
            b.add_field("value", Builtin::String)
                .add_annotation(ANNOTATION_NAME, Some(name))?
                .add_annotation(ANNOTATION_CONTENT_TYPE, None)?
                .add_annotation(ANNOTATION_LABEL, Some(label))?
                .add_annotation(ANNOTATION_DESCRIPTION, Some(description))?;
            Ok(())
        })?;
    }
    Ok(())
}

fn register_data_types(types: &Types) -> Result<()> {
    types.get_or_add(TICKSPAN, None, |b| {
        b.add_field("tickSpan", Builtin::Long);
        Ok(())
    })?;
    types.get_or_add(TICKS, None, |b| {
        b.add_field("ticks", Builtin::Long);
        Ok(())
    })?;
    types.get_or_add(THREAD_GROUP, None, |b| {
        let parent = b.self_type();
        b.add_field("parent", parent)
            .add_field("name", Builtin::String);
        Ok(())
    })?;
    types.get_or_add(THREAD, None, |b| {
        b.add_field("osName", Builtin::String)
            .add_field("osThreadId", Builtin::Long)
            .add_field("javaName", Builtin::String)
            .add_field("javaThreadId", Builtin::Long)
            .add_field("group", THREAD_GROUP);
        Ok(())
    })?;
    types.get_or_add(CLASS_LOADER, None, |b| {
        b.add_field("type", CLASS).add_field("name", Builtin::String);
        Ok(())
    })?;
    types.get_or_add(FRAME_TYPE, None, |b| {
        b.add_field("description", Builtin::String);
        Ok(())
    })?;
    types.get_or_add(SYMBOL, None, |b| {
        b.add_field("string", Builtin::String);
        Ok(())
    })?;
    types.get_or_add(METHOD, None, |b| {
        b.add_field("type", CLASS)
            .add_field("name", SYMBOL)
            .add_field("descriptor", SYMBOL)
            .add_field("modifiers", Builtin::Int)
            .add_field("hidden", Builtin::Boolean);
        Ok(())
    })?;
    types.get_or_add(STACK_FRAME, None, |b| {
        b.add_field("method", METHOD)
            .add_field("lineNumber", Builtin::Int)
            .add_field("bytecodeIndex", Builtin::Int)
            .add_field("type", FRAME_TYPE);
        Ok(())
    })?;
    types.get_or_add(STACK_TRACE, None, |b| {
        b.add_field("truncated", Builtin::Boolean)
            .add_field_with("frames", STACK_FRAME, |f| {
                f.as_array();
                Ok(())
            })?;
        Ok(())
    })?;
    types.get_or_add(MODULE, None, |b| {
        b.add_field("name", SYMBOL)
            .add_field("version", SYMBOL)
            .add_field("location", SYMBOL)
            .add_field("classLoader", CLASS_LOADER);
        Ok(())
    })?;
    types.get_or_add(PACKAGE, None, |b| {
        b.add_field("name", SYMBOL)
            .add_field("module", MODULE)
            .add_field("exported", Builtin::Boolean);
        Ok(())
    })?;
    types.get_or_add(CLASS, None, |b| {
        b.add_field("classLoader", CLASS_LOADER)
            .add_field("name", SYMBOL)
            .add_field("package", PACKAGE)
            .add_field("modifiers", Builtin::Int)
            .add_field("hidden", Builtin::Boolean);
        Ok(())
    })?;
    Ok(())
}
