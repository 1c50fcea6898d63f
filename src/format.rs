//! Human-readable rendering of results

use crate::value::Value;

const INDENT: usize = 2;

/// Indentation stops growing past this many levels, so output stays linear
/// in the size of the value.
pub const MAX_INDENT_DEPTH: usize = 64;

/// Render `value` as indented text.
///
/// None is shown as `<None>`, strings verbatim. Map class fields are labelled
/// with their display names, with the colons aligned:
///
/// ```text
/// [
///   {
///     Name      : DELAY
///     Library   : <Internal>
///     Executable: <None>
///   }
/// ]
/// ```
pub fn format_object(value: &Value) -> String {
    let mut out = String::new();
    let mut tasks = vec![Task::Value(value, 0)];
    while let Some(task) = tasks.pop() {
        match task {
            Task::Text(text) => out.push_str(text),
            Task::Label(label) => out.push_str(&label),
            Task::Pad(depth) => pad(depth, &mut out),
            Task::Value(value, depth) => write_value(value, depth, &mut out, &mut tasks),
        }
    }
    out
}

/// Pending output, popped last-in first-out
enum Task<'a> {
    Value(&'a Value, usize),
    Text(&'static str),
    Label(String),
    Pad(usize),
}

/// Write the opening of `value` and schedule the rest.
fn write_value<'a>(value: &'a Value, depth: usize, out: &mut String, tasks: &mut Vec<Task<'a>>) {
    match value {
        Value::None => out.push_str("<None>"),
        Value::String(s) => out.push_str(s),
        Value::List(items) if items.is_empty() => out.push_str("[]"),
        Value::List(items) => {
            out.push_str("[\n");
            tasks.push(Task::Text("]"));
            tasks.push(Task::Pad(depth));
            for item in items.iter().rev() {
                tasks.push(Task::Text("\n"));
                tasks.push(Task::Value(item, depth + 1));
                tasks.push(Task::Pad(depth + 1));
            }
        }
        Value::Map(map) => {
            let fields = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
            write_fields(fields, depth, out, tasks);
        }
        Value::MapClass(mc) => {
            let fields = mc
                .iter()
                .map(|(key, v)| (mc.display_name(key).unwrap_or(key), v))
                .collect();
            write_fields(fields, depth, out, tasks);
        }
    }
}

fn write_fields<'a>(
    fields: Vec<(&str, &'a Value)>,
    depth: usize,
    out: &mut String,
    tasks: &mut Vec<Task<'a>>,
) {
    if fields.is_empty() {
        out.push_str("{}");
        return;
    }
    let width = fields
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);

    out.push_str("{\n");
    tasks.push(Task::Text("}"));
    tasks.push(Task::Pad(depth));
    for (label, v) in fields.into_iter().rev() {
        tasks.push(Task::Text("\n"));
        tasks.push(Task::Value(v, depth + 1));
        tasks.push(Task::Label(format!("{:<width$}: ", label, width = width)));
        tasks.push(Task::Pad(depth + 1));
    }
}

fn pad(depth: usize, out: &mut String) {
    out.extend(std::iter::repeat(' ').take(depth.min(MAX_INDENT_DEPTH) * INDENT));
}
