//! spark-examples：增量 SIP 解析器的演示支撑代码。
//!
//! # 设计要点（Why）
//! - 演示二进制只负责参数解析与日志初始化，驱动逻辑放在库中，便于单元测试覆盖；
//! - [`dump_request`] 以固定块大小模拟传输层分片，结果投影为 JSON，方便脚本化比对。

use serde_json::{Map, Value, json};
use spark_codec_sip::{Fields, ParseStatus, RequestParser, SipParseError};
use tracing::info;

/// 一次演示运行的结果。
#[derive(Debug)]
pub enum DumpOutcome {
    /// 请求完整，附带 JSON 投影。
    Complete(Value),
    /// 输入耗尽时请求仍不完整，附带已消费的字节数。
    Truncated(usize),
}

/// 以 `chunk_size` 字节为一块把 `input` 输入解析器。
///
/// `chunk_size` 为 0 时按 1 处理。无论成功与否，解析器在返回前都会被 `release`。
pub fn dump_request(
    parser: &mut RequestParser,
    input: &[u8],
    chunk_size: usize,
) -> Result<DumpOutcome, SipParseError> {
    let mut fed = 0;
    for chunk in input.chunks(chunk_size.max(1)) {
        fed += chunk.len();
        let status = match parser.parse(chunk) {
            Ok(status) => status,
            Err(error) => {
                parser.release();
                return Err(error);
            }
        };
        if status == ParseStatus::Complete {
            info!(fed, total = input.len(), "request complete");
            let value = project(parser);
            parser.release();
            return Ok(DumpOutcome::Complete(value));
        }
    }
    parser.release();
    Ok(DumpOutcome::Truncated(fed))
}

fn project(parser: &RequestParser) -> Value {
    let request = parser.request();
    let uri = request.uri();
    json!({
        "method": request.method(),
        "uri": {
            "scheme": uri.scheme(),
            "user": uri.user(),
            "password": uri.password(),
            "host": uri.host(),
            "port": uri.port(),
            "params": fields(uri.params()),
        },
        "proto": request.proto().as_str(),
        "headers": fields(request.headers()),
        "content_length": request.content_length(),
        "body": String::from_utf8_lossy(request.body()),
    })
}

fn fields(view: Fields<'_>) -> Value {
    let map: Map<String, Value> = view
        .iter()
        .map(|(name, values)| (name.to_owned(), values.collect::<Vec<_>>().into()))
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_chunks_produce_json_projection() {
        let mut parser = RequestParser::default();
        let input = b"OPTIONS sip:carol@chicago.com;transport=udp SIP/2.0\r\n\
Accept: application/sdp\r\n\
Content-Length: 2\r\n\
\r\n\
ok";
        let outcome = dump_request(&mut parser, input, 7).expect("valid request");
        let DumpOutcome::Complete(value) = outcome else {
            panic!("request should complete");
        };
        assert_eq!(value["method"], "OPTIONS");
        assert_eq!(value["uri"]["user"], "carol");
        assert_eq!(value["uri"]["port"], Value::Null);
        assert_eq!(value["uri"]["params"]["transport"][0], "udp");
        assert_eq!(value["headers"]["Accept"][0], "application/sdp");
        assert_eq!(value["body"], "ok");
    }

    #[test]
    fn truncated_input_reports_consumed_bytes() {
        let mut parser = RequestParser::default();
        let outcome = dump_request(&mut parser, b"INVITE sip:h SIP/2.0\r\n", 0).expect("no error yet");
        assert!(matches!(outcome, DumpOutcome::Truncated(22)));
    }
}
