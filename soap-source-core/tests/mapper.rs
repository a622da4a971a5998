use serde_json::json;
use soap_source_core::mapper::extract_payload;
use soap_source_core::{response_to_json, response_to_value, xml_to_json, MappingError};

#[test]
fn repeated_siblings_collapse_into_an_array() {
    let value = response_to_value(b"<Root><A>1</A><A>2</A></Root>").unwrap();
    assert_eq!(value, json!({"Root": {"A": ["1", "2"]}}));
}

#[test]
fn element_order_is_preserved() {
    let out = response_to_json(b"<R><z>1</z><a>2</a><m>3</m><a>4</a></R>").unwrap();
    assert_eq!(out, r#"{"R":{"z":"1","a":["2","4"],"m":"3"}}"#);
}

#[test]
fn soap_body_content_becomes_the_document() {
    let envelope = br#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Header><auth>ignored</auth></soap:Header>
  <soap:Body>
    <ns2:GetOrderResponse xmlns:ns2="http://example.com/orders">
      <order id="42">
        <item>apple</item>
        <item>pear</item>
        <total>3.50</total>
      </order>
    </ns2:GetOrderResponse>
  </soap:Body>
</soap:Envelope>"#;

    let value = response_to_value(envelope).unwrap();
    assert_eq!(
        value,
        json!({
            "GetOrderResponse": {
                "order": {
                    "id": "42",
                    "item": ["apple", "pear"],
                    "total": "3.50"
                }
            }
        })
    );
}

#[test]
fn extracted_payload_is_a_standalone_document() {
    let doc = extract_payload(
        "<e:Envelope xmlns:e=\"urn:e\"><e:Body><Ping><v>1</v></Ping></e:Body></e:Envelope>",
    )
    .unwrap();
    assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(doc.ends_with("<Ping xmlns:e=\"urn:e\"><v>1</v></Ping>"));
}

#[test]
fn payload_keeps_namespaces_declared_on_the_envelope() {
    let doc = extract_payload(
        "<S:Envelope xmlns:S=\"urn:s\" xmlns:ns2=\"urn:orders\">\
         <S:Body xmlns:ns2=\"urn:orders:v2\"><ns2:Ack xmlns:S=\"urn:own\"><ns2:id>7</ns2:id></ns2:Ack></S:Body>\
         </S:Envelope>",
    )
    .unwrap();
    assert!(
        doc.ends_with(
            "<ns2:Ack xmlns:S=\"urn:own\" xmlns:ns2=\"urn:orders:v2\"><ns2:id>7</ns2:id></ns2:Ack>"
        ),
        "{doc}"
    );
    assert_eq!(xml_to_json(&doc).unwrap(), json!({"Ack": {"id": "7"}}));
}

#[test]
fn empty_elements_and_entities() {
    let value = xml_to_json("<R><empty/><blank></blank><t>a &amp; b</t></R>").unwrap();
    assert_eq!(value, json!({"R": {"empty": "", "blank": "", "t": "a & b"}}));
}

#[test]
fn mixed_text_is_kept_under_empty_key() {
    let value = xml_to_json("<R>hello<b>x</b></R>").unwrap();
    assert_eq!(value, json!({"R": {"b": "x", "": "hello"}}));
}

#[test]
fn cdata_is_text() {
    let value = xml_to_json("<R><![CDATA[<raw>]]></R>").unwrap();
    assert_eq!(value, json!({"R": "<raw>"}));
}

#[test]
fn malformed_xml_is_a_mapping_error() {
    for bad in [
        &b"<Root><A>1</B></Root>"[..],
        &b"<Root><A>1</A>"[..],
        &b"not xml at all"[..],
        &b"<a>1</a><b>2</b>"[..],
        &b"<a/><b/>"[..],
    ] {
        let err = response_to_json(bad).unwrap_err();
        assert!(
            matches!(err, MappingError::Malformed(_) | MappingError::NoRootElement),
            "{err}"
        );
    }
}

#[test]
fn second_root_element_is_rejected() {
    let err = response_to_value(b"<a>1</a><b>2</b>").unwrap_err();
    assert!(matches!(err, MappingError::Malformed(ref m) if m == "multiple root elements"), "{err}");
}

#[test]
fn empty_document_has_no_root() {
    assert!(matches!(
        response_to_json(b"").unwrap_err(),
        MappingError::NoRootElement
    ));
}

#[test]
fn envelope_without_body_content_is_rejected() {
    let err = response_to_json(b"<s:Envelope xmlns:s=\"urn:s\"><s:Body/></s:Envelope>").unwrap_err();
    assert!(matches!(err, MappingError::EmptyBody));
}
