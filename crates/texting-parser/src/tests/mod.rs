//! Session-level tests for the streaming parser.
//!
//! Traces are rendered with [`normalize::render`] and compared as inline
//! snapshots. Every session run through [`run_with`] is also checked against
//! the receiver contract in [`invariants`].


use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::{
    CALL_ID_LEN, CallRecord, Event, EventRecorder, EventSink, Grammar, TextingError,
    TextingParser, coalesce_chunks,
};
use normalize::render;

pub struct Session {
    pub events: Vec<Event>,
    pub calls: Vec<CallRecord>,
}

pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

/// Feeds `fragments` in order, finalizes and checks the stream invariants.
pub fn run_with(grammar: Grammar, fragments: &[&str]) -> Session {
    let session = block_on(async {
        let mut parser = TextingParser::with_grammar(grammar, EventRecorder::new()).unwrap();
        for fragment in fragments {
            parser.feed(fragment).await.unwrap();
        }
        parser.finalize().await.unwrap();
        let calls = parser.collected_calls().to_vec();
        Session {
            events: parser.into_receiver().into_events(),
            calls,
        }
    });

    invariants::check_families(&session.events);
    invariants::check_verbatim(&fragments.concat(), &session.events);
    session
}

pub fn run(fragments: &[&str]) -> Session {
    run_with(Grammar::default(), fragments)
}

// Basic documents

#[test]
fn plain_text_is_one_markdown_family() {
    let session = run(&["Hello world"]);
    assert_snapshot!(render(&session.events), @r#"
    markdown_start
    markdown_chunk "Hello world"
    markdown_finish
    "#);
    assert!(session.calls.is_empty());
}

#[test]
fn empty_input_reports_nothing() {
    let session = run(&[]);
    assert!(session.events.is_empty());
    assert!(session.calls.is_empty());
}

#[test]
fn call_with_plain_body_and_terminator() {
    let session = run(&["!!@tool1 run\nline1\nline2\n!!@/"]);
    assert_snapshot!(render(&session.events), @r#"
    call_start tool1
    call_headline_chunk "tool1 run"
    call_headline_finish
    call_body_start
    call_body_chunk "line1\nline2\n"
    call_body_finish
    call_finish
    "#);

    let call = &session.calls[0];
    assert_eq!(call.first_mention, "tool1");
    assert_eq!(call.head_line, "tool1 run");
    assert_eq!(call.body.as_deref(), Some("line1\nline2\n"));
    assert!(!call.is_fenced());
}

#[test]
fn code_block_with_info_string() {
    let session = run(&["```py\nprint(1)\n```"]);
    assert_snapshot!(render(&session.events), @r#"
    code_block_start "```" "py"
    code_block_chunk "print(1)\n"
    code_block_finish "```"
    "#);
}

#[test]
fn consecutive_bodyless_calls() {
    let session = run(&["!!@a\n!!@b\n"]);
    assert_snapshot!(render(&session.events), @r#"
    call_start a
    call_headline_chunk "a"
    call_headline_finish
    call_finish
    call_start b
    call_headline_chunk "b"
    call_headline_finish
    call_finish
    "#);
    assert_eq!(session.calls.len(), 2);
    assert!(session.calls.iter().all(|c| !c.has_body()));
}

#[test]
fn prose_before_a_call_is_closed_first() {
    let session = run(&["intro\n!!@a"]);
    assert_snapshot!(render(&session.events), @r#"
    markdown_start
    markdown_chunk "intro\n"
    markdown_finish
    call_start a
    call_headline_chunk "a"
    call_headline_finish
    call_finish
    "#);
}

// Markers and fences

#[rstest]
#[case(&["!", "!@a b\n"])]
#[case(&["!!", "@a b\n"])]
#[case(&["!!@", "a b\n"])]
#[case(&["!!@a", " b\n"])]
#[case(&["!!@a b\n"])]
fn marker_split_does_not_matter(#[case] fragments: &[&str]) {
    let session = run(fragments);
    assert_eq!(
        render(&session.events),
        "call_start a\ncall_headline_chunk \"a b\"\ncall_headline_finish\ncall_finish"
    );
}

#[rstest]
#[case("say !!@a hi")]
#[case("!!@ nope")]
#[case("!!@-nope")]
#[case("user@example.com")]
#[case("!!@/ stray terminator")]
fn non_calls_stay_prose(#[case] input: &str) {
    let session = run(&[input]);
    assert_eq!(
        session.events,
        vec![
            Event::MarkdownStart,
            Event::MarkdownChunk {
                text: input.to_string()
            },
            Event::MarkdownFinish,
        ]
    );
}

#[rstest]
#[case::double_backtick("``x\n", false)]
#[case::exact_fence("```x\ny\n```\n", true)]
#[case::long_fence("`````\ny\n`````\n", true)]
#[case::fence_mid_line("a ```x\n", false)]
fn fence_length_boundary(#[case] input: &str, #[case] is_code_block: bool) {
    let session = run(&[input]);
    let opened = session
        .events
        .iter()
        .any(|e| matches!(e, Event::CodeBlockStart { .. }));
    assert_eq!(opened, is_code_block);
}

#[test]
fn longer_fence_contains_shorter_one() {
    let session = run(&["````\n```\n````\n"]);
    assert_snapshot!(render(&session.events), @r#"
    code_block_start "````" ""
    code_block_chunk "```\n"
    code_block_finish "````"
    "#);
}

#[test]
fn inline_quote_hides_markers() {
    let session = run(&["`\n!!@a`"]);
    assert_snapshot!(render(&session.events), @r#"
    markdown_start
    markdown_chunk "`\n!!@a`"
    markdown_finish
    "#);
    assert!(session.calls.is_empty());
}

#[test]
fn unclosed_code_block_closes_at_end_of_input() {
    let session = run(&["```\nlet x = 1;"]);
    assert_snapshot!(render(&session.events), @r#"
    code_block_start "```" ""
    code_block_chunk "let x = 1;"
    code_block_finish ""
    "#);
}

// Call structure

#[test]
fn fenced_body() {
    let session = run(&["!!@a run\n```json\n{\"k\": 1}\n```\nafter"]);
    assert_snapshot!(render(&session.events), @r#"
    call_start a
    call_headline_chunk "a run"
    call_headline_finish
    call_body_start "```json"
    call_body_chunk "{\"k\": 1}\n"
    call_body_finish "```"
    call_finish
    markdown_start
    markdown_chunk "after"
    markdown_finish
    "#);

    let call = &session.calls[0];
    assert_eq!(call.body_fence.as_deref(), Some("```json"));
    assert_eq!(call.body.as_deref(), Some("{\"k\": 1}\n"));
}

#[rstest]
#[case::longer_opener("!!@a\n````\nx\n```\n````\n", "x\n```\n", "````")]
#[case::trailing_text("!!@a\n```\nx\n``` y\n```\n", "x\n``` y\n", "```")]
#[case::trailing_blanks("!!@a\n```\nx\n```  \nafter", "x\n", "```")]
#[case::longer_closer("!!@a\n```\nx\n`````\n", "x\n", "`````")]
fn fenced_body_closes_only_on_a_long_enough_run(
    #[case] input: &str,
    #[case] body: &str,
    #[case] closing: &str,
) {
    let session = run(&[input]);
    assert_eq!(session.calls[0].body.as_deref(), Some(body));
    assert!(session.events.contains(&Event::CallBodyFinish {
        closing_fence: Some(closing.to_string())
    }));
}

#[test]
fn markers_inside_fenced_body_are_literal() {
    let session = run(&["!!@a\n```\n!!@b\n!!@/\n```\n"]);
    assert_eq!(session.calls.len(), 1);
    assert_eq!(session.calls[0].body.as_deref(), Some("!!@b\n!!@/\n"));
}

#[test]
fn unterminated_fenced_body() {
    let session = run(&["!!@a\n```\ncode"]);
    assert_snapshot!(render(&session.events), @r#"
    call_start a
    call_headline_chunk "a"
    call_headline_finish
    call_body_start "```"
    call_body_chunk "code"
    call_body_finish ""
    call_finish
    "#);
}

#[test]
fn plain_body_ends_at_next_call() {
    let session = run(&["!!@a\nbody\n!!@b hi"]);
    assert_snapshot!(render(&session.events), @r#"
    call_start a
    call_headline_chunk "a"
    call_headline_finish
    call_body_start
    call_body_chunk "body\n"
    call_body_finish
    call_finish
    call_start b
    call_headline_chunk "b hi"
    call_headline_finish
    call_finish
    "#);
}

#[test]
fn terminator_swallows_rest_of_its_line() {
    let session = run(&["!!@a\nx\n!!@/  \nmore"]);
    assert_snapshot!(render(&session.events), @r#"
    call_start a
    call_headline_chunk "a"
    call_headline_finish
    call_body_start
    call_body_chunk "x\n"
    call_body_finish
    call_finish
    markdown_start
    markdown_chunk "more"
    markdown_finish
    "#);
}

#[test]
fn text_after_a_terminator_keeps_its_leading_blanks() {
    let session = run(&["!!@a\nx\n!!@/ tail words\n"]);
    assert_snapshot!(render(&session.events), @r#"
    call_start a
    call_headline_chunk "a"
    call_headline_finish
    call_body_start
    call_body_chunk "x\n"
    call_body_finish
    call_finish
    markdown_start
    markdown_chunk " tail words\n"
    markdown_finish
    "#);
}

#[rstest]
#[case::blank_tail(&["!!@a\nx\n!!@/  \nmore"], "more")]
#[case::text_tail(&["!!@a\nx\n!!@/ tail words\n"], " tail words\n")]
#[case::split_before_text(&["!!@a\nx\n!!@/ ", " ", "tail"], "  tail")]
#[case::tab_then_quote(&["!!@a\n!!@/\t`q`"], "\t`q`")]
#[case::crlf_tail(&["!!@a\nx\n!!@/ \r", "\nmore"], "more")]
#[case::blanks_at_end(&["!!@a\nx\n!!@/  "], "")]
fn terminator_line_tail(#[case] fragments: &[&str], #[case] prose: &str) {
    let session = run(fragments);
    let markdown: String = session
        .events
        .iter()
        .filter_map(|e| match e {
            Event::MarkdownChunk { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(markdown, prose);
    assert_eq!(session.calls.len(), 1);
}

#[test]
fn crlf_breaks_stay_out_of_delimiters() {
    let session = run(&[concat!(
        "```py\r\nx\r\n```\r\n",
        "!!@a hi\r\n  @b\r\n",
        "```json\r\n{}\r\n```\r\n",
    )]);
    assert_snapshot!(render(&session.events), @r#"
    code_block_start "```" "py"
    code_block_chunk "x\r\n"
    code_block_finish "```"
    call_start a
    call_headline_chunk "a hi\r\n  @b"
    call_headline_finish
    call_body_start "```json"
    call_body_chunk "{}\r\n"
    call_body_finish "```"
    call_finish
    "#);
    assert_eq!(session.calls[0].body_fence.as_deref(), Some("```json"));
}

#[rstest]
#[case::whole(&["!!@a hi\r\nbody\r\n!!@/\r\n"])]
#[case::split_in_break(&["!!@a hi\r", "\nbody\r\n!!@/\r", "\n"])]
#[case::split_in_info(&["!!@a hi\r\n```", "sh\r", "\nbody\r\n```\r\n"])]
fn crlf_headline_break(#[case] fragments: &[&str]) {
    let session = run(fragments);
    let call = &session.calls[0];
    assert_eq!(call.head_line, "a hi");
    assert_eq!(call.body.as_deref(), Some("body\r\n"));
    assert!(call.body_fence.as_deref().is_none_or(|fence| fence == "```sh"));
}

#[test]
fn lone_carriage_return_is_headline_text() {
    let session = run(&["!!@a x\ry\n", "!!@b\r"]);
    assert_eq!(session.calls[0].head_line, "a x\ry");
    assert_eq!(session.calls[1].head_line, "b\r");
}

#[test]
fn headline_continues_on_mention_lines() {
    let session = run(&["!!@a hi\n  @b also\nbody\n!!@/"]);
    let call = &session.calls[0];
    assert_eq!(call.head_line, "a hi\n  @b also");
    assert_eq!(call.body.as_deref(), Some("body\n"));
    assert_eq!(call.mentions(&Grammar::default()), vec!["a", "b"]);
}

#[test]
fn blank_lines_before_plain_body_are_kept() {
    let session = run(&["!!@a\n\n  text\n!!@/"]);
    assert_eq!(session.calls[0].body.as_deref(), Some("\n  text\n"));
}

#[test]
fn blank_lines_between_bodyless_calls_are_dropped() {
    let session = run(&["!!@a\n\n!!@b\n"]);
    assert_snapshot!(render(&session.events), @r#"
    call_start a
    call_headline_chunk "a"
    call_headline_finish
    call_finish
    call_start b
    call_headline_chunk "b"
    call_headline_finish
    call_finish
    "#);
}

#[test]
fn trailing_dots_are_trimmed_from_the_mention() {
    let session = run(&["!!@tool1... go"]);
    assert_eq!(session.calls[0].first_mention, "tool1");
    assert_eq!(session.calls[0].head_line, "tool1... go");
}

#[test]
fn bare_grammar() {
    let session = run_with(Grammar::bare(), &["@bob hi\nbody\n@/\ntail"]);
    assert_snapshot!(render(&session.events), @r#"
    call_start bob
    call_headline_chunk "bob hi"
    call_headline_finish
    call_body_start
    call_body_chunk "body\n"
    call_body_finish
    call_finish
    markdown_start
    markdown_chunk "tail"
    markdown_finish
    "#);
}

#[test]
fn canonical_document_round_trips() {
    let input = concat!(
        "Intro line\n",
        "!!@tool1 run this\n",
        "line one\n",
        "!!@/\n",
        "```py\n",
        "print(1)\n",
        "```\n",
        "!!@b\n",
        "!!@c go\n",
        "```json\n",
        "{}\n",
        "```\n",
        "tail",
    );
    let grammar = Grammar::default();
    let session = run(&[input]);
    assert_eq!(invariants::reconstruct(&session.events, &grammar), input);
    assert_eq!(
        session
            .calls
            .iter()
            .map(|c| c.first_mention.as_str())
            .collect::<Vec<_>>(),
        vec!["tool1", "b", "c"]
    );
}

// Call ids

#[test]
fn call_ids_are_short_and_distinct() {
    let session = run(&["!!@a\n!!@a\n"]);
    let ids: Vec<_> = session.calls.iter().map(|c| c.call_id.as_str()).collect();
    assert!(ids.iter().all(|id| id.len() == CALL_ID_LEN));
    assert_ne!(ids[0], ids[1]);

    let reported: Vec<_> = session
        .events
        .iter()
        .filter_map(|e| match e {
            Event::CallFinish { call_id } => Some(call_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(reported, ids);
}

#[test]
fn call_ids_survive_resplitting() {
    let input = "!!@a run\nx\n!!@/\n!!@b\n```\ny\n```\n";
    let whole = run(&[input]);
    let chars: Vec<String> = input.chars().map(String::from).collect();
    let refs: Vec<&str> = chars.iter().map(String::as_str).collect();
    let split = run(&refs);
    assert_eq!(whole.calls, split.calls);
}

// Session lifecycle

#[test]
fn certain_text_is_delivered_before_feed_returns() {
    block_on(async {
        let mut parser = TextingParser::new(EventRecorder::new());
        parser.feed("Hello").await.unwrap();
        assert_eq!(
            parser.receiver().events,
            vec![
                Event::MarkdownStart,
                Event::MarkdownChunk {
                    text: "Hello".to_string()
                },
            ]
        );
    });
}

#[test]
fn undecided_marker_is_held_back() {
    block_on(async {
        let mut parser = TextingParser::new(EventRecorder::new());
        parser.feed("!!").await.unwrap();
        assert!(parser.receiver().events.is_empty());
        parser.feed("x").await.unwrap();
        assert_eq!(
            parser.receiver().events[1],
            Event::MarkdownChunk {
                text: "!!x".to_string()
            }
        );
    });
}

#[test]
fn calls_are_collected_mid_stream() {
    block_on(async {
        let mut parser = TextingParser::new(EventRecorder::new());
        parser.feed("!!@a\nx\n!!@/\n").await.unwrap();
        assert_eq!(parser.collected_calls().len(), 1);
        parser.feed("!!@b\n").await.unwrap();
        assert_eq!(parser.collected_calls().len(), 1);
        parser.finalize().await.unwrap();
        assert_eq!(parser.collected_calls().len(), 2);
    });
}

#[test]
fn session_cannot_be_reused_after_finalize() {
    block_on(async {
        let mut parser = TextingParser::new(EventRecorder::new());
        parser.finalize().await.unwrap();
        assert!(parser.is_finished());
        assert!(matches!(
            parser.finalize().await,
            Err(TextingError::SessionFinished)
        ));
        assert!(matches!(
            parser.feed("more").await,
            Err(TextingError::SessionFinished)
        ));
    });
}

#[test]
fn invalid_grammar_is_rejected() {
    let grammar = Grammar {
        call_marker: String::new(),
        ..Grammar::default()
    };
    assert!(matches!(
        TextingParser::with_grammar(grammar, EventRecorder::new()),
        Err(TextingError::InvalidGrammar(_))
    ));
}

/// Accepts everything except calls.
#[derive(Default)]
struct RejectCalls {
    seen: usize,
}

impl EventSink for RejectCalls {
    async fn event(&mut self, event: Event) -> anyhow::Result<()> {
        if let Event::CallStart { first_mention } = event {
            anyhow::bail!("no handler for {first_mention}");
        }
        self.seen += 1;
        Ok(())
    }
}

#[test]
fn receiver_failure_aborts_the_feed() {
    block_on(async {
        let mut parser = TextingParser::new(RejectCalls::default());
        let err = parser.feed("hi\n!!@tool1 go").await.unwrap_err();
        assert!(matches!(err, TextingError::Receiver(_)));
        assert_eq!(err.to_string(), "no handler for tool1");
        // prose before the call was still delivered
        assert_eq!(parser.receiver().seen, 3);
    });
}

/// Suspends before recording each notification.
#[derive(Default)]
struct SuspendingRecorder {
    events: Vec<Event>,
}

impl EventSink for SuspendingRecorder {
    async fn event(&mut self, event: Event) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        self.events.push(event);
        Ok(())
    }
}

#[test]
fn suspending_receiver_sees_the_same_stream() {
    let head = "intro\n!!@a run\nx\n!!@/\n";
    let tail = "```py\ny\n```\n!!@b\n```\nz\n```\n";
    let expected = run(&[head, tail]);

    let (events, calls) = block_on(async {
        let mut parser = TextingParser::new(SuspendingRecorder::default());
        parser.feed(head).await.unwrap();
        // the first call was delivered in full before feed returned
        assert_eq!(parser.collected_calls().len(), 1);
        assert!(matches!(
            parser.receiver().events.last(),
            Some(Event::CallFinish { .. })
        ));

        for ch in tail.chars() {
            parser.feed(&ch.to_string()).await.unwrap();
        }
        parser.finalize().await.unwrap();
        let calls = parser.collected_calls().to_vec();
        (parser.into_receiver().events, calls)
    });

    assert_eq!(coalesce_chunks(events), coalesce_chunks(expected.events));
    assert_eq!(calls, expected.calls);
}
