//! End-to-end search and lookup tests through the tool handlers.

mod common;

use assert2::{check, let_assert};
use capldoc_mcp::tools::details::{FunctionDetailsRequest, handle_function_details};
use capldoc_mcp::tools::parse::{ParseDocumentRequest, handle_parse_document};
use capldoc_mcp::tools::search::{SemanticSearchRequest, handle_semantic_search};
use common::{TIMER_START_DOC, TestContext, UDP_SEND_DOC, context};
use rstest::rstest;

fn search_request(context: &TestContext, query: &str) -> SemanticSearchRequest {
    SemanticSearchRequest {
        query: query.to_string(),
        corpus_paths: context.root_strings(),
        top_k: 5,
        min_score: 0.1,
        force_rebuild: false,
    }
}

/// Extract, index, lookup and search against a corpus holding exactly one
/// document.
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn udp_send_end_to_end(context: TestContext) {
    context.write_doc("UdpSend.md", UDP_SEND_DOC);

    // the indexed record carries everything the extractor found
    let index = context.state.index_for(&context.roots(), false).await.unwrap();
    let_assert!(Some(record) = index.lookup("UdpSend"));
    check!(record.name == "UdpSend");
    check!(record.syntax_forms.len() == 1);
    check!(record.syntax_forms[0] == "long UdpSend(dword socket, byte data[], dword size)");
    check!(record.parameters.len() == 2);
    check!(
        record.example.as_deref()
            == Some("on key 's'\n{\n  UdpSend(gSocket, gBuffer, elcount(gBuffer));\n}")
    );

    // a prose query finds it as the top (and only) result above min_score
    let response = handle_semantic_search(&context.state, search_request(&context, "send data over udp"))
        .await
        .unwrap();
    check!(response.results.len() == 1);
    check!(response.results[0].name == "UdpSend");
    check!(response.results[0].score > 0.1);
    check!(response.message.is_none());
}

/// Every record a corpus load produced is retrievable by exact name.
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn lookup_round_trips_every_record(context: TestContext) {
    context.write_doc("UdpSend.md", UDP_SEND_DOC);
    context.write_doc("TimerStart.md", TIMER_START_DOC);

    let index = context.state.index_for(&context.roots(), false).await.unwrap();
    check!(index.records.len() == 2);
    for record in &index.records {
        let_assert!(Some(found) = index.lookup(&record.name));
        check!(found == record);
    }
    check!(index.lookup("NoSuchFunction123").is_none());
}

/// A query made of exactly one record's name tokens ranks that record above
/// any record that does not contain them.
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn name_query_outranks_unrelated_records(context: TestContext) {
    context.write_doc("UdpSend.md", UDP_SEND_DOC);
    context.write_doc("TimerStart.md", TIMER_START_DOC);

    let response = handle_semantic_search(&context.state, search_request(&context, "UdpSend"))
        .await
        .unwrap();
    check!(!response.results.is_empty());
    check!(response.results[0].name == "UdpSend");
    check!(!response.results.iter().any(|result| result.name == "TimerStart"));
}

/// One result row per function, carrying the best-matching section.
#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn results_are_folded_per_function(context: TestContext) {
    context.write_doc("UdpSend.md", UDP_SEND_DOC);

    let mut request = search_request(&context, "udp socket transmit payload");
    request.min_score = 0.0;
    let response = handle_semantic_search(&context.state, request).await.unwrap();

    check!(response.results.len() == 1, "chunk hits must fold into one row");
    check!(["overview", "parameters", "example"]
        .contains(&response.results[0].section.as_str()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_searches_are_deterministic(context: TestContext) {
    context.write_doc("UdpSend.md", UDP_SEND_DOC);
    context.write_doc("TimerStart.md", TIMER_START_DOC);

    let first = handle_semantic_search(&context.state, search_request(&context, "timer handler"))
        .await
        .unwrap();
    let second = handle_semantic_search(&context.state, search_request(&context, "timer handler"))
        .await
        .unwrap();

    let names: Vec<&str> = first.results.iter().map(|r| r.name.as_str()).collect();
    let names_again: Vec<&str> = second.results.iter().map(|r| r.name.as_str()).collect();
    check!(names == names_again);
    for (a, b) in first.results.iter().zip(&second.results) {
        check!(a.score.to_bits() == b.score.to_bits());
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_corpus_reports_message_not_error(context: TestContext) {
    let response = handle_semantic_search(&context.state, search_request(&context, "anything"))
        .await
        .unwrap();
    check!(response.results.is_empty());
    let_assert!(Some(message) = response.message);
    check!(message.contains("no markdown documents"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_arguments_are_rejected(context: TestContext) {
    context.write_doc("UdpSend.md", UDP_SEND_DOC);

    let mut zero_k = search_request(&context, "udp");
    zero_k.top_k = 0;
    check!(handle_semantic_search(&context.state, zero_k).await.is_err());

    let mut bad_score = search_request(&context, "udp");
    bad_score.min_score = 1.5;
    check!(handle_semantic_search(&context.state, bad_score).await.is_err());

    let no_paths = SemanticSearchRequest {
        query: "udp".to_string(),
        corpus_paths: vec![],
        top_k: 5,
        min_score: 0.1,
        force_rebuild: false,
    };
    check!(handle_semantic_search(&context.state, no_paths).await.is_err());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn details_returns_full_record(context: TestContext) {
    context.write_doc("UdpSend.md", UDP_SEND_DOC);

    let response = handle_function_details(
        &context.state,
        FunctionDetailsRequest {
            function_name: "UdpSend".to_string(),
            corpus_paths: context.root_strings(),
        },
    )
    .await
    .unwrap();

    check!(response.found);
    let_assert!(Some(record) = response.record);
    check!(record.parameters[0].name == "socket");
    check!(record.valid_for.as_deref() == Some("CANoe DE, CANoe4SW DE"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn details_miss_is_a_negative_result(context: TestContext) {
    context.write_doc("UdpSend.md", UDP_SEND_DOC);

    let response = handle_function_details(
        &context.state,
        FunctionDetailsRequest {
            // lookup is case-sensitive; this must miss
            function_name: "udpsend".to_string(),
            corpus_paths: context.root_strings(),
        },
    )
    .await
    .unwrap();

    check!(!response.found);
    check!(response.record.is_none());
    let_assert!(Some(message) = response.message);
    check!(message.contains("not found"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn parse_single_document_returns_record(context: TestContext) {
    let path = context.write_doc("UdpSend.md", UDP_SEND_DOC);

    let record = handle_parse_document(ParseDocumentRequest {
        file_path: path.to_string_lossy().into_owned(),
    })
    .await
    .unwrap();

    check!(record.name == "UdpSend");
    check!(record.parameters.len() == 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn parse_single_document_surfaces_decode_errors(context: TestContext) {
    let path = context.write_bytes("binary.md", &[0xff, 0xfe, 0x00, 0x9f]);

    let error = handle_parse_document(ParseDocumentRequest {
        file_path: path.to_string_lossy().into_owned(),
    })
    .await
    .unwrap_err();
    check!(error.contains("UTF-8"));

    let missing = handle_parse_document(ParseDocumentRequest {
        file_path: "/nonexistent/NoSuchDoc.md".to_string(),
    })
    .await
    .unwrap_err();
    check!(missing.contains("File not found"));
}

/// Concurrent cold-cache searches share one build and do not interfere.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_cold_cache_searches_build_once() {
    let context = TestContext::new();
    context.write_doc("UdpSend.md", UDP_SEND_DOC);
    context.write_doc("TimerStart.md", TIMER_START_DOC);

    let mut handles = vec![];
    for i in 0..8 {
        let state = context.state.clone();
        let corpus_paths = context.root_strings();
        handles.push(tokio::spawn(async move {
            let request = SemanticSearchRequest {
                query: "send udp".to_string(),
                corpus_paths,
                top_k: 5,
                min_score: 0.1,
                force_rebuild: false,
            };
            (i, handle_semantic_search(&state, request).await)
        }));
    }

    for handle in handles {
        let (i, result) = handle.await.expect("task should not panic");
        let response = result.unwrap_or_else(|e| panic!("search {} failed: {}", i, e));
        check!(response.results.first().map(|r| r.name.as_str()) == Some("UdpSend"));
    }

    check!(
        context.state.build_count() == 1,
        "all concurrent searches must share a single build"
    );
}
