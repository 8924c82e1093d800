/// Deserialization tests for `Message` using stream-json payloads shaped like
/// the Claude CLI's output.
#[cfg(test)]
mod unit {
    use crate::task::{classify, TaskEvent};
    use crate::types::{
        ContentBlock, Message, ResultMessage, SystemPayload, UserBody, UserContentBlock,
    };

    fn parse(json: &str) -> Message {
        serde_json::from_str(json).expect("failed to parse message")
    }

    #[test]
    fn parse_system_init() {
        let json = r#"{
            "type": "system",
            "subtype": "init",
            "session_id": "abc-123",
            "model": "claude-sonnet-4-6",
            "tools": ["WebSearch", "WebFetch"],
            "permission_mode": "default",
            "cwd": "/tmp"
        }"#;
        let Message::System(sys) = parse(json) else {
            panic!("expected System")
        };
        assert_eq!(sys.session_id, "abc-123");
        let SystemPayload::Init(init) = sys.payload else {
            panic!("expected Init")
        };
        assert_eq!(init.model, "claude-sonnet-4-6");
        assert_eq!(init.tools, vec!["WebSearch", "WebFetch"]);
    }

    #[test]
    fn parse_system_unknown_subtype() {
        let json = r#"{"type":"system","subtype":"compact_boundary","session_id":"s"}"#;
        let Message::System(sys) = parse(json) else {
            panic!("expected System")
        };
        assert!(matches!(sys.payload, SystemPayload::Unknown));
    }

    #[test]
    fn parse_assistant_tool_use_and_thinking() {
        let json = r#"{
            "type": "assistant",
            "session_id": "s",
            "message": {
                "id": "msg_1",
                "role": "assistant",
                "content": [
                    {"type": "thinking", "thinking": "look it up"},
                    {"type": "tool_use", "id": "tu_1", "name": "WebSearch", "input": {"query": "meal kit market size"}},
                    {"type": "server_tool_use", "id": "x"}
                ]
            }
        }"#;
        let Message::Assistant(a) = parse(json) else {
            panic!("expected Assistant")
        };
        assert_eq!(a.message.content.len(), 3);
        assert!(matches!(a.message.content[0], ContentBlock::Thinking { .. }));
        assert!(matches!(a.message.content[2], ContentBlock::Other));

        let events = classify(&Message::Assistant(a));
        assert_eq!(
            events,
            vec![TaskEvent::ToolUse {
                name: "WebSearch".into(),
                detail: Some("meal kit market size".into()),
            }]
        );
    }

    #[test]
    fn parse_user_prompt_echo_as_text() {
        let json = r#"{"type":"user","session_id":"s","message":{"role":"user","content":"hello"}}"#;
        let Message::User(u) = parse(json) else {
            panic!("expected User")
        };
        assert!(matches!(u.message.content, UserBody::Text(ref t) if t == "hello"));
        assert!(classify(&Message::User(u)).is_empty());
    }

    #[test]
    fn parse_tool_result_blocks() {
        let json = r#"{
            "type": "user",
            "session_id": "s",
            "message": {"content": [{
                "type": "tool_result",
                "tool_use_id": "tu_1",
                "is_error": false,
                "content": [
                    {"type": "text", "text": "Result: https://example.com/report"},
                    {"type": "image", "source": {}}
                ]
            }]}
        }"#;
        let msg = parse(json);
        let Message::User(ref u) = msg else {
            panic!("expected User")
        };
        let UserBody::Blocks(ref blocks) = u.message.content else {
            panic!("expected blocks")
        };
        let UserContentBlock::ToolResult {
            content: Some(ref body),
            ..
        } = blocks[0]
        else {
            panic!("expected ToolResult")
        };
        assert_eq!(body.text(), "Result: https://example.com/report");
        assert_eq!(
            classify(&msg),
            vec![TaskEvent::ToolResult {
                urls: vec!["https://example.com/report".into()]
            }]
        );
    }

    #[test]
    fn parse_result_success() {
        let json = r#"{
            "type": "result",
            "subtype": "success",
            "session_id": "abc-123",
            "result": "[{\"name\":\"Stackr\"}]",
            "duration_ms": 5000,
            "is_error": false,
            "num_turns": 3,
            "total_cost_usd": 0.0042
        }"#;
        let Message::Result(result) = parse(json) else {
            panic!("expected Result")
        };
        assert!(!result.is_error());
        assert_eq!(result.session_id(), "abc-123");
        assert_eq!(result.result_text(), Some(r#"[{"name":"Stackr"}]"#));
        assert!(result.error_summary().is_none());
    }

    #[test]
    fn parse_result_error_subtypes() {
        let json = r#"{
            "type": "result",
            "subtype": "error_during_execution",
            "session_id": "s",
            "num_turns": 1,
            "errors": ["network unreachable"]
        }"#;
        let Message::Result(result) = parse(json) else {
            panic!("expected Result")
        };
        assert!(result.is_error());
        assert!(matches!(result, ResultMessage::ErrorDuringExecution(_)));
        assert_eq!(
            result.error_summary().as_deref(),
            Some("error during execution: network unreachable")
        );
        assert!(result.result_text().is_none());

        let budget = r#"{"type":"result","subtype":"error_max_budget_usd","session_id":"s"}"#;
        let Message::Result(result) = parse(budget) else {
            panic!("expected Result")
        };
        assert_eq!(result.error_summary().as_deref(), Some("budget exhausted"));
    }

    #[test]
    fn success_flagged_as_error_is_error() {
        let json = r#"{"type":"result","subtype":"success","session_id":"s","result":"Credit balance too low","is_error":true}"#;
        let msg = parse(json);
        assert_eq!(
            classify(&msg),
            vec![TaskEvent::Final {
                text: "Credit balance too low".into(),
                is_error: true
            }]
        );
    }

    #[test]
    fn session_id_empty_is_none() {
        let msg = parse(r#"{"type":"system","subtype":"init"}"#);
        assert!(msg.session_id().is_none());
    }
}
