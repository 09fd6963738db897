//! RequestParser 端到端契约测试。
//!
//! # 覆盖范围（What）
//! - 规范 INVITE 的整包解析与字段读取；
//! - URI 百分号解码与 `+` 解码；
//! - 每一类上限对应独立的错误与状态码；
//! - 失败态粘滞、`release` 后的独立性、空块不改变状态。

use spark_codec_sip::{
    ErrorClass, FieldWriteError, ParseStatus, Request, RequestParser, Settings, SettingsError,
    SipParseError, ValuePool,
};

const INVITE: &[u8] = b"INVITE sip:bob@biloxi.com SIP/2.0\r\n\
Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK776asdhds\r\n\
Max-Forwards: 70\r\n\
To: Bob <sip:bob@biloxi.com>\r\n\
From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
Call-ID: a84b4c76e66710@pc33.atlanta.com\r\n\
CSeq: 314159 INVITE\r\n\
Contact: <sip:alice@pc33.atlanta.com>\r\n\
Content-Type: application/sdp\r\n\
Content-Length: 13\r\n\
\r\n\
some SDP here";

fn parser_with(configure: impl FnOnce(&mut Settings)) -> RequestParser {
    let mut settings = Settings::default();
    configure(&mut settings);
    RequestParser::with_settings(settings)
}

#[test]
fn canonical_invite_is_fully_captured() {
    let mut parser = RequestParser::default();
    assert_eq!(parser.parse(INVITE), Ok(ParseStatus::Complete));

    let request = parser.request();
    assert_eq!(request.method(), "INVITE");
    assert_eq!(request.uri().scheme(), "sip");
    assert_eq!(request.uri().user(), Some("bob"));
    assert_eq!(request.uri().host(), "biloxi.com");
    assert_eq!(request.proto().version(), "2.0");
    assert_eq!(request.content_length(), 13);
    assert_eq!(request.body(), b"some SDP here");

    let headers = request.headers();
    let expected = [
        ("Via", "SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK776asdhds"),
        ("Max-Forwards", "70"),
        ("To", "Bob <sip:bob@biloxi.com>"),
        ("From", "Alice <sip:alice@atlanta.com>;tag=1928301774"),
        ("Call-ID", "a84b4c76e66710@pc33.atlanta.com"),
        ("CSeq", "314159 INVITE"),
        ("Contact", "<sip:alice@pc33.atlanta.com>"),
        ("Content-Type", "application/sdp"),
        ("Content-Length", "13"),
    ];
    for (name, value) in expected {
        assert_eq!(headers.get(name), Some(value), "header {name}");
    }
    assert_eq!(headers.get("content-type"), Some("application/sdp"));
    assert_eq!(headers.len(), expected.len());
}

#[test]
fn percent_and_plus_sequences_are_decoded() {
    let mut parser = RequestParser::default();
    let status = parser.parse(
        b"INVITE sip:bob%20smith:fancy%20password@biloxi.com:5060;key1=val%20ue2;key2=val+ue SIP/2.0\r\n\r\n",
    );
    assert_eq!(status, Ok(ParseStatus::Complete));

    let uri = parser.request().uri();
    assert_eq!(uri.user(), Some("bob smith"));
    assert_eq!(uri.password(), Some("fancy password"));
    assert_eq!(uri.host(), "biloxi.com");
    assert_eq!(uri.port(), Some(5060));
    assert_eq!(uri.params().get("key1"), Some("val ue2"));
    assert_eq!(uri.params().get("key2"), Some("val ue"));
}

#[test]
fn malformed_escape_fails_in_every_segment() {
    let cases: [&[u8]; 8] = [
        b"INVITE sip:bo%2Gb@host SIP/2.0\r\n",
        b"INVITE sip:bob:pa%2Gss@host SIP/2.0\r\n",
        b"INVITE sip:host;k%2G=v SIP/2.0\r\n",
        b"INVITE sip:host;k=v%2G SIP/2.0\r\n",
        b"INVITE sip:bo%G2b@host SIP/2.0\r\n",
        b"INVITE sip:bob:pa%G2ss@host SIP/2.0\r\n",
        b"INVITE sip:host;k%G2=v SIP/2.0\r\n",
        b"INVITE sip:host;k=v%G2 SIP/2.0\r\n",
    ];
    for case in cases {
        let mut parser = RequestParser::default();
        assert_eq!(
            parser.parse(case),
            Err(SipParseError::UriDecoding),
            "{}",
            String::from_utf8_lossy(case)
        );
    }
}

#[test]
fn bad_high_nibble_in_a_later_chunk_fails() {
    let mut parser = RequestParser::default();
    assert_eq!(
        parser.parse(b"INVITE sip:bob%"),
        Ok(ParseStatus::Incomplete)
    );
    assert_eq!(
        parser.parse(b"G2@host SIP/2.0\r\n"),
        Err(SipParseError::UriDecoding)
    );
}

#[test]
fn non_utf8_host_is_a_decoding_error_on_every_path() {
    let cases: [&[u8]; 4] = [
        b"INVITE sip:u@\xff SIP/2.0\r\n",
        b"INVITE sip:\xff;lr SIP/2.0\r\n",
        b"INVITE sip:\xff:5060 SIP/2.0\r\n",
        b"INVITE sip:\xff SIP/2.0\r\n",
    ];
    for case in cases {
        let mut parser = RequestParser::default();
        let err = parser.parse(case).unwrap_err();
        assert_eq!(
            err,
            SipParseError::UriDecoding,
            "{}",
            String::from_utf8_lossy(case)
        );
        assert_eq!(err.status().as_u16(), 521);
    }
}

#[test]
fn escape_split_across_chunks_is_decoded() {
    let mut parser = RequestParser::default();
    for chunk in [
        &b"INVITE sip:bob%"[..],
        b"2",
        b"0smith@host SIP/2.0\r",
        b"\n\r",
        b"\n",
    ] {
        let _ = parser.parse(chunk).expect("valid input");
    }
    assert!(parser.is_complete());
    assert_eq!(parser.request().uri().user(), Some("bob smith"));
}

#[test]
fn oversized_header_value_is_a_limit_error() {
    let mut parser = parser_with(|s| s.headers.max_value_length = 8);
    let err = parser
        .parse(b"OPTIONS sip:h SIP/2.0\r\nSubject: exactly-too-long\r\n\r\n")
        .unwrap_err();
    assert_eq!(err, SipParseError::HeaderFieldsTooLarge);
    assert_eq!(err.status().as_u16(), 524);
    assert_eq!(err.class(), ErrorClass::ResourceLimit);
}

#[test]
fn each_limit_maps_to_a_distinct_error() {
    let mut parser = parser_with(|s| s.request_line.max_method_length = 4);
    assert_eq!(
        parser.parse(b"REGISTER sip:h SIP/2.0\r\n"),
        Err(SipParseError::MethodNotImplemented)
    );

    let mut parser = parser_with(|s| s.request_line.max_length = 16);
    assert_eq!(
        parser.parse(b"INVITE sip:a.very.long.host SIP/2.0\r\n"),
        Err(SipParseError::UriTooLong)
    );

    let mut parser = parser_with(|s| s.headers.max_number = 1);
    assert_eq!(
        parser.parse(b"ACK sip:h SIP/2.0\r\nA: 1\r\nB: 2\r\n\r\n"),
        Err(SipParseError::TooManyHeaders)
    );

    let mut parser = parser_with(|s| s.headers.max_key_length = 3);
    assert_eq!(
        parser.parse(b"ACK sip:h SIP/2.0\r\nSubject: x\r\n\r\n"),
        Err(SipParseError::HeaderFieldsTooLarge)
    );

    let mut parser = parser_with(|s| s.body.max_length = 10);
    assert_eq!(
        parser.parse(b"ACK sip:h SIP/2.0\r\nContent-Length: 11\r\n\r\n"),
        Err(SipParseError::RequestEntityTooLarge)
    );
}

#[test]
fn header_arena_exhaustion_is_a_limit_error() {
    let mut parser = parser_with(|s| {
        s.headers.value_arena_capacity = 12;
        s.headers.buffer_prealloc = 12;
    });
    assert_eq!(
        parser.parse(b"ACK sip:h SIP/2.0\r\nA: 123456\r\nB: 7890123\r\n\r\n"),
        Err(SipParseError::HeaderFieldsTooLarge)
    );
}

#[test]
fn http_request_line_is_unsupported_protocol() {
    let mut parser = RequestParser::default();
    let err = parser.parse(b"GET sip:h HTTP/1.1\r\n\r\n").unwrap_err();
    assert_eq!(err, SipParseError::UnsupportedProtocol);
    assert_eq!(err.status().as_u16(), 522);
}

#[test]
fn protocol_literal_is_case_insensitive() {
    let mut parser = RequestParser::default();
    assert_eq!(
        parser.parse(b"OPTIONS sip:h sip/2.0\r\n\r\n"),
        Ok(ParseStatus::Complete)
    );
    assert_eq!(parser.request().proto().as_str(), "sip/2.0");
}

#[test]
fn syntax_errors_are_bad_request() {
    let cases: [&[u8]; 8] = [
        b" INVITE sip:h SIP/2.0\r\n",
        b"INVITE sip: SIP/2.0\r\n",
        b"INVITE sip:h:port SIP/2.0\r\n",
        b"INVITE sip:h SIP/\r\n",
        b"INVITE sip:h SIP/2.0\rX",
        b"INVITE sip:h SIP/2.0\r\nVia\r\n",
        b"INVITE sip:h SIP/2.0\r\nContent-Length: 1x\r\n",
        b"INVITE sip:h SIP/2.0\r\nContent-Length: 1\r\nContent-Length: 2\r\n",
    ];
    for case in cases {
        let mut parser = RequestParser::default();
        let err = parser.parse(case).unwrap_err();
        assert_eq!(
            err,
            SipParseError::BadRequest,
            "{}",
            String::from_utf8_lossy(case)
        );
        assert_eq!(err.class(), ErrorClass::Syntax);
    }
}

#[test]
fn content_length_tolerates_surrounding_whitespace() {
    let mut parser = RequestParser::default();
    let status = parser.parse(b"MESSAGE sip:h SIP/2.0\r\ncontent-length:   4  \r\n\r\nping");
    assert_eq!(status, Ok(ParseStatus::Complete));
    assert_eq!(parser.request().content_length(), 4);
    assert_eq!(parser.request().headers().get("Content-Length"), Some("4"));
    assert_eq!(parser.request().body(), b"ping");
}

#[test]
fn repeated_headers_keep_arrival_order() {
    let mut parser = RequestParser::default();
    parser
        .parse(b"BYE sip:h SIP/2.0\r\nVia: first\r\nvia: second\r\nVIA: third\r\n\r\n")
        .expect("valid request");
    let values: Vec<_> = parser
        .request()
        .headers()
        .get_all("Via")
        .expect("via present")
        .collect();
    assert_eq!(values, ["first", "second", "third"]);
    assert_eq!(parser.request().headers().len(), 1);
}

#[test]
fn empty_header_value_is_kept() {
    let mut parser = RequestParser::default();
    parser
        .parse(b"OPTIONS sip:h SIP/2.0\nSubject:\nAccept: \n\n")
        .expect("valid request");
    let headers = parser.request().headers();
    assert_eq!(headers.get("Subject"), Some(""));
    assert_eq!(headers.get("Accept"), Some(""));
}

#[test]
fn failure_is_sticky_until_release() {
    let mut parser = RequestParser::default();
    let err = parser.parse(b"INVITE sip:h HTTX").unwrap_err();
    assert_eq!(parser.parse(b"ignored"), Err(err));
    assert_eq!(parser.parse(b""), Err(err));

    parser.release();
    assert_eq!(
        parser.parse(b"ACK sip:h SIP/2.0\r\n\r\n"),
        Ok(ParseStatus::Complete)
    );
}

#[test]
fn release_leaves_no_residue() {
    let mut parser = RequestParser::default();
    assert_eq!(parser.parse(INVITE), Ok(ParseStatus::Complete));
    parser.release();

    let second = b"BYE sip:carol@chicago.com;transport=tcp SIP/2.0\r\nCall-ID: other\r\n\r\n";
    assert_eq!(parser.parse(second), Ok(ParseStatus::Complete));

    let request = parser.request();
    assert_eq!(request.method(), "BYE");
    assert_eq!(request.uri().user(), Some("carol"));
    assert_eq!(request.uri().host(), "chicago.com");
    assert_eq!(request.uri().password(), None);
    assert_eq!(request.uri().params().get("transport"), Some("tcp"));
    assert_eq!(request.headers().len(), 1);
    assert_eq!(request.headers().get("Via"), None);
    assert_eq!(request.headers().get("Call-ID"), Some("other"));
    assert_eq!(request.content_length(), 0);
    assert!(request.body().is_empty());
}

#[test]
fn empty_chunks_do_not_change_progress() {
    let mut parser = RequestParser::default();
    assert_eq!(parser.parse(b""), Ok(ParseStatus::Incomplete));

    let (head, tail) = INVITE.split_at(100);
    assert_eq!(parser.parse(head), Ok(ParseStatus::Incomplete));
    assert_eq!(parser.parse(b""), Ok(ParseStatus::Incomplete));
    assert_eq!(parser.parse(tail), Ok(ParseStatus::Complete));
    assert_eq!(parser.parse(b""), Ok(ParseStatus::Complete));
    assert_eq!(parser.request().body(), b"some SDP here");
}

#[test]
fn pool_lists_are_reused_across_requests() {
    let settings = Settings::default();
    let request = Request::with_settings(&settings);
    let mut parser = RequestParser::new(request, ValuePool::new(16, 2), settings);

    for _ in 0..3 {
        assert_eq!(parser.parse(INVITE), Ok(ParseStatus::Complete));
        parser.release();
    }

    let (_request, pool) = parser.into_parts();
    let stats = pool.stats();
    assert_eq!(stats.allocated, 9, "first request allocates one list per header name");
    assert_eq!(stats.reused, 18);
    assert_eq!(stats.idle, 9);
}

#[test]
fn manual_headers_can_follow_a_parse() {
    let mut parser = RequestParser::default();
    parser
        .parse(b"OPTIONS sip:h SIP/2.0\r\n\r\n")
        .expect("valid request");
    parser
        .request_mut()
        .headers_mut()
        .add("Accept", &["application/sdp"])
        .expect("arena has room");
    assert_eq!(
        parser.request().headers().get("accept"),
        Some("application/sdp")
    );
}

#[test]
fn manual_writes_wait_for_the_field_in_progress() {
    let mut parser = RequestParser::default();
    assert_eq!(
        parser.parse(b"OPTIONS sip:h SIP/2.0\r\nSubj"),
        Ok(ParseStatus::Incomplete)
    );
    assert_eq!(
        parser.request_mut().headers_mut().add("Accept", &["text/plain"]),
        Err(FieldWriteError::FieldInProgress)
    );

    assert_eq!(parser.parse(b"\r"), Err(SipParseError::BadRequest));
    parser
        .request_mut()
        .headers_mut()
        .add("Accept", &["text/plain"])
        .expect("failed parse leaves no field in progress");
    assert_eq!(parser.request().headers().get("accept"), Some("text/plain"));
}

#[test]
fn zero_limits_are_refused_at_construction() {
    let mut settings = Settings::default();
    settings.request_line.max_method_length = 0;
    let err = RequestParser::try_with_settings(settings).unwrap_err();
    assert!(matches!(
        err,
        SettingsError::ZeroLimit {
            field: "request_line.max_method_length"
        }
    ));
    assert!(RequestParser::try_with_settings(Settings::default()).is_ok());
}
