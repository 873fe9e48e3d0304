//! HPACK header-block tests against the worked examples of RFC 7541
//! Appendix C, plus encoder/decoder state-convergence checks.

use h2wire::hpack::{Decoder, Encoder, HeaderField};

fn assert_fields(fields: &[HeaderField], expect: &[(&str, &str)]) {
    assert_eq!(fields.len(), expect.len());
    for (field, (name, value)) in fields.iter().zip(expect) {
        assert_eq!(field.name, name.as_bytes());
        assert_eq!(field.value, value.as_bytes());
    }
}

#[test]
fn test_rfc_c3_request_sequence() {
    let mut decoder = Decoder::new(4096);

    // C.3.1
    let block = [
        0x82, 0x86, 0x84, 0x41, 0x0f, 0x77, 0x77, 0x77, 0x2e, 0x65, 0x78, 0x61,
        0x6d, 0x70, 0x6c, 0x65, 0x2e, 0x63, 0x6f, 0x6d,
    ];
    let fields = decoder.decode(&block).unwrap();
    assert_fields(
        &fields,
        &[
            (":method", "GET"),
            (":scheme", "http"),
            (":path", "/"),
            (":authority", "www.example.com"),
        ],
    );
    assert_eq!(decoder.table().size(), 57);

    // C.3.2: authority now served from the dynamic table
    let block = [
        0x82, 0x86, 0x84, 0xbe, 0x58, 0x08, 0x6e, 0x6f, 0x2d, 0x63, 0x61, 0x63,
        0x68, 0x65,
    ];
    let fields = decoder.decode(&block).unwrap();
    assert_fields(
        &fields,
        &[
            (":method", "GET"),
            (":scheme", "http"),
            (":path", "/"),
            (":authority", "www.example.com"),
            ("cache-control", "no-cache"),
        ],
    );
    assert_eq!(decoder.table().size(), 110);

    // C.3.3
    let block = [
        0x82, 0x87, 0x85, 0xbf, 0x40, 0x0a, 0x63, 0x75, 0x73, 0x74, 0x6f, 0x6d,
        0x2d, 0x6b, 0x65, 0x79, 0x0c, 0x63, 0x75, 0x73, 0x74, 0x6f, 0x6d, 0x2d,
        0x76, 0x61, 0x6c, 0x75, 0x65,
    ];
    let fields = decoder.decode(&block).unwrap();
    assert_fields(
        &fields,
        &[
            (":method", "GET"),
            (":scheme", "https"),
            (":path", "/index.html"),
            (":authority", "www.example.com"),
            ("custom-key", "custom-value"),
        ],
    );
    assert_eq!(decoder.table().size(), 164);
    assert_eq!(decoder.table().len(), 3);
}

#[test]
fn test_rfc_c5_response_sequence_with_eviction() {
    // Responses decoded with a 256-octet dynamic table, forcing eviction
    let mut decoder = Decoder::new(256);

    // C.5.1
    let block = [
        0x48, 0x03, 0x33, 0x30, 0x32, 0x58, 0x07, 0x70, 0x72, 0x69, 0x76, 0x61,
        0x74, 0x65, 0x61, 0x1d, 0x4d, 0x6f, 0x6e, 0x2c, 0x20, 0x32, 0x31, 0x20,
        0x4f, 0x63, 0x74, 0x20, 0x32, 0x30, 0x31, 0x33, 0x20, 0x32, 0x30, 0x3a,
        0x31, 0x33, 0x3a, 0x32, 0x31, 0x20, 0x47, 0x4d, 0x54, 0x6e, 0x17, 0x68,
        0x74, 0x74, 0x70, 0x73, 0x3a, 0x2f, 0x2f, 0x77, 0x77, 0x77, 0x2e, 0x65,
        0x78, 0x61, 0x6d, 0x70, 0x6c, 0x65, 0x2e, 0x63, 0x6f, 0x6d,
    ];
    let fields = decoder.decode(&block).unwrap();
    assert_fields(
        &fields,
        &[
            (":status", "302"),
            ("cache-control", "private"),
            ("date", "Mon, 21 Oct 2013 20:13:21 GMT"),
            ("location", "https://www.example.com"),
        ],
    );
    assert_eq!(decoder.table().size(), 222);
    assert_eq!(decoder.table().len(), 4);

    // C.5.2: inserting ":status: 307" evicts ":status: 302"
    let block = [0x48, 0x03, 0x33, 0x30, 0x37, 0xc1, 0xc0, 0xbf];
    let fields = decoder.decode(&block).unwrap();
    assert_fields(
        &fields,
        &[
            (":status", "307"),
            ("cache-control", "private"),
            ("date", "Mon, 21 Oct 2013 20:13:21 GMT"),
            ("location", "https://www.example.com"),
        ],
    );
    assert_eq!(decoder.table().size(), 222);
    assert_eq!(decoder.table().get(62).unwrap().1, b"307");

    // C.5.3: two more evictions leave exactly three entries
    let block = [
        0x88, 0xc1, 0x61, 0x1d, 0x4d, 0x6f, 0x6e, 0x2c, 0x20, 0x32, 0x31, 0x20,
        0x4f, 0x63, 0x74, 0x20, 0x32, 0x30, 0x31, 0x33, 0x20, 0x32, 0x30, 0x3a,
        0x31, 0x33, 0x3a, 0x32, 0x32, 0x20, 0x47, 0x4d, 0x54, 0xc0, 0x5a, 0x04,
        0x67, 0x7a, 0x69, 0x70, 0x77, 0x38, 0x66, 0x6f, 0x6f, 0x3d, 0x41, 0x53,
        0x44, 0x4a, 0x4b, 0x48, 0x51, 0x4b, 0x42, 0x5a, 0x58, 0x4f, 0x51, 0x57,
        0x45, 0x4f, 0x50, 0x49, 0x55, 0x41, 0x58, 0x51, 0x57, 0x45, 0x4f, 0x49,
        0x55, 0x3b, 0x20, 0x6d, 0x61, 0x78, 0x2d, 0x61, 0x67, 0x65, 0x3d, 0x33,
        0x36, 0x30, 0x30, 0x3b, 0x20, 0x76, 0x65, 0x72, 0x73, 0x69, 0x6f, 0x6e,
        0x3d, 0x31,
    ];
    let fields = decoder.decode(&block).unwrap();
    assert_fields(
        &fields,
        &[
            (":status", "200"),
            ("cache-control", "private"),
            ("date", "Mon, 21 Oct 2013 20:13:22 GMT"),
            ("location", "https://www.example.com"),
            ("content-encoding", "gzip"),
            (
                "set-cookie",
                "foo=ASDJKHQKBZXOQWEOPIUAXQWEOIU; max-age=3600; version=1",
            ),
        ],
    );
    assert_eq!(decoder.table().size(), 215);
    assert_eq!(decoder.table().len(), 3);
    assert_eq!(decoder.table().get(62).unwrap().0, b"set-cookie");
}

#[test]
fn test_encoder_decoder_converge_under_eviction() {
    // Small table so repeated blocks churn through evictions on both sides
    let mut encoder = Encoder::new(128);
    let mut decoder = Decoder::new(128);

    for i in 0..20 {
        let fields = vec![
            HeaderField::new(":method", "GET"),
            HeaderField::new("x-request-id", format!("req-{i}")),
            HeaderField::new("x-shard", format!("shard-{}", i % 3)),
        ];
        let block = encoder.encode(&fields);
        let decoded = decoder.decode(&block).unwrap();

        assert_eq!(decoded.len(), fields.len());
        for (got, want) in decoded.iter().zip(&fields) {
            assert_eq!(got.name, want.name);
            assert_eq!(got.value, want.value);
        }
        assert_eq!(encoder.table().size(), decoder.table().size());
        assert_eq!(encoder.table().len(), decoder.table().len());
    }
}

#[test]
fn test_sensitive_fields_survive_re_encoding() {
    let mut encoder = Encoder::new(4096);
    let mut decoder = Decoder::new(4096);

    let fields = vec![
        HeaderField::new(":method", "POST"),
        HeaderField::new("authorization", "Basic dXNlcjpwYXNz").sensitive(),
    ];
    let block = encoder.encode(&fields);
    let decoded = decoder.decode(&block).unwrap();

    // A proxy re-encoding these fields must keep the never-index marker
    let mut re_encoder = Encoder::new(4096);
    let re_encoded = re_encoder.encode(&decoded);
    let mut re_decoder = Decoder::new(4096);
    let re_decoded = re_decoder.decode(&re_encoded).unwrap();

    assert_eq!(re_decoded[1].indexing, h2wire::Indexing::NeverIndex);
    assert!(re_encoder.table().is_empty());
}
