use anyhow::bail;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::coap::codes::{MessageCode, MessageType};
use crate::coap::message::CoapMessage;
use crate::coap::token::Token;
use crate::coap::WireCodec;
use crate::format::ContentFormat;

/// A structural stand-in for a real wire-format library: every field goes out in a
///  fixed layout, without the header packing and option compression of the actual
///  protocol. Good enough to run two channels against each other in tests.
pub struct FixedLayoutCodec;

impl WireCodec for FixedLayoutCodec {
    fn encode(&self, msg: &CoapMessage) -> anyhow::Result<Bytes> {
        let mut buf = BytesMut::new();
        buf.put_u8(msg.msg_type.into());
        buf.put_u8(msg.code.into());
        buf.put_u16(msg.message_id);
        put_chunk(&mut buf, msg.token.as_slice());
        put_opt_chunk(&mut buf, msg.path.as_deref().map(str::as_bytes));
        put_opt_chunk(&mut buf, msg.proxy_uri.as_deref().map(str::as_bytes));
        match msg.content_format {
            Some(format) => {
                buf.put_u8(1);
                buf.put_u16(format.into());
            }
            None => buf.put_u8(0),
        }
        buf.put_slice(&msg.content);
        Ok(buf.freeze())
    }

    fn decode(&self, mut buf: &[u8]) -> anyhow::Result<CoapMessage> {
        let msg_type = MessageType::try_from(buf.try_get_u8()?)?;
        let code = MessageCode::try_from(buf.try_get_u8()?)?;
        let message_id = buf.try_get_u16()?;
        let token = Token::new(&get_chunk(&mut buf)?)?;
        let path = get_opt_chunk(&mut buf)?.map(string_from).transpose()?;
        let proxy_uri = get_opt_chunk(&mut buf)?.map(string_from).transpose()?;
        let content_format = match buf.try_get_u8()? {
            0 => None,
            _ => Some(ContentFormat::try_from(buf.try_get_u16()?)?),
        };
        let content = Bytes::copy_from_slice(buf);

        Ok(CoapMessage {
            msg_type,
            code,
            message_id,
            token,
            path,
            proxy_uri,
            content,
            content_format,
        })
    }
}

fn put_chunk(buf: &mut BytesMut, chunk: &[u8]) {
    buf.put_u16(chunk.len() as u16);
    buf.put_slice(chunk);
}

fn put_opt_chunk(buf: &mut BytesMut, chunk: Option<&[u8]>) {
    match chunk {
        Some(chunk) => {
            buf.put_u8(1);
            put_chunk(buf, chunk);
        }
        None => buf.put_u8(0),
    }
}

fn get_chunk(buf: &mut &[u8]) -> anyhow::Result<Vec<u8>> {
    let len = buf.try_get_u16()? as usize;
    if buf.remaining() < len {
        bail!("chunk is truncated");
    }
    let mut chunk = vec![0u8; len];
    buf.copy_to_slice(&mut chunk);
    Ok(chunk)
}

fn get_opt_chunk(buf: &mut &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
    match buf.try_get_u8()? {
        0 => Ok(None),
        _ => Ok(Some(get_chunk(buf)?)),
    }
}

fn string_from(chunk: Vec<u8>) -> anyhow::Result<String> {
    Ok(String::from_utf8(chunk)?)
}
