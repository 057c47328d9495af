use anyhow::{anyhow, Context};
use bytes::Bytes;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::rpc::value::{RpcValue, Scalar};

/// Serializes the value tree into a document whose root element is named after the
///  operation, one child element per field.
pub fn encode(value: &RpcValue, operation: &str) -> anyhow::Result<Bytes> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, operation, value)?;
    Ok(Bytes::from(writer.into_inner()))
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &RpcValue) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    if let Some(scalar) = value.scalar() {
        writer.write_event(Event::Text(BytesText::new(&scalar.render())))?;
    }
    for (child_name, values) in value.children() {
        for child in values {
            write_element(writer, child_name, child)?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Parses a document and maps the root element's content into the value tree: child
///  elements become fields (repeated elements become multi-valued fields), text becomes
///  the node's scalar. Element text is untyped here - the schema cast downstream turns
///  it into the declared scalar kind where possible.
pub fn decode(content: &[u8]) -> anyhow::Result<RpcValue> {
    let mut reader = Reader::from_reader(content);
    let mut buf = Vec::new();

    // index 0 is a sentinel so the root element folds like any other
    let mut stack: Vec<RpcValue> = vec![RpcValue::empty()];
    let mut names: Vec<String> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event_into(&mut buf).context("malformed xml content")? {
            Event::Start(e) => {
                names.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                stack.push(RpcValue::empty());
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match stack.len() {
                    1 => root = Some(RpcValue::empty()),
                    _ => stack.last_mut().expect("sentinel always present").push_child(name, RpcValue::empty()),
                }
            }
            Event::Text(e) => {
                let text = e.unescape().context("malformed xml content")?;
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    stack
                        .last_mut()
                        .expect("sentinel always present")
                        .set_scalar(Scalar::Str(trimmed.to_string()));
                }
            }
            Event::End(_) => {
                let finished = stack.pop().expect("balanced by the reader");
                let name = names.pop().expect("balanced by the reader");
                if stack.len() == 1 {
                    root = Some(finished);
                } else {
                    stack.last_mut().expect("sentinel always present").push_child(name, finished);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| anyhow!("xml content has no root element"))
}
