use super::*;

#[test]
fn role_accepts_only_the_two_literals() {
    let user: Role = serde_json::from_str("\"user\"").unwrap();
    let assistant: Role = serde_json::from_str("\"assistant\"").unwrap();
    assert_eq!(user, Role::User);
    assert_eq!(assistant, Role::Assistant);

    assert!(serde_json::from_str::<Role>("\"system\"").is_err());
    assert!(serde_json::from_str::<Role>("\"User\"").is_err());
}

#[test]
fn conversation_order_survives_serialization() {
    let history = vec![
        Message::user("how many rows?"),
        Message::assistant("1042 rows."),
        Message::user("plot revenue by month"),
    ];

    let json = serde_json::to_string(&history).unwrap();
    let back: Vec<Message> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, history);
}

#[test]
fn agent_input_carries_csv_bytes_as_base64() {
    let input = AgentInput {
        csv_buffer: b"name,amount\na,1\nb,2\n".to_vec(),
        user_message: "summarize".to_string(),
        conversation_history: vec![],
    };

    let json = serde_json::to_value(&input).unwrap();
    // Binary field must be a string on the wire, not a byte array.
    assert!(json["csvBuffer"].is_string());

    let back: AgentInput = serde_json::from_value(json).unwrap();
    assert_eq!(back.csv_buffer, input.csv_buffer);
}

#[test]
fn agent_output_round_trip_is_byte_exact() {
    let output = AgentOutput {
        summary: "Revenue grew 12% month over month.".to_string(),
        charts: vec![vec![0x89, 0x50, 0x4e, 0x47, 0x00, 0xff], vec![1, 2, 3]],
        external_context: Some("industry average is 8%".to_string()),
        structured_report: Some(ReportData {
            summary: "Strong quarter.".to_string(),
            kpis: vec!["Revenue: $1.2M".to_string(), "Orders: 4,310".to_string()],
            charts: vec![ReportChart {
                title: "Revenue by month".to_string(),
                bullets: vec!["March is the peak".to_string()],
            }],
            external_context: None,
            next_steps: Some(vec!["Drill into churn".to_string()]),
            additional_details: None,
        }),
        insights: serde_json::json!({"top_segment": "retail"}),
    };

    let json = serde_json::to_string(&output).unwrap();
    let back: AgentOutput = serde_json::from_str(&json).unwrap();

    assert_eq!(back.summary, output.summary);
    assert_eq!(back.charts, output.charts);
    assert_eq!(back.external_context, output.external_context);
    assert_eq!(back.structured_report, output.structured_report);
    assert_eq!(back.insights, output.insights);
}

#[test]
fn report_data_preserves_kpi_and_chart_order() {
    let report = ReportData {
        summary: "s".to_string(),
        kpis: (0..8).map(|i| format!("kpi-{i}")).collect(),
        charts: (0..5)
            .map(|i| ReportChart {
                title: format!("chart-{i}"),
                bullets: vec![format!("b-{i}-0"), format!("b-{i}-1")],
            })
            .collect(),
        external_context: None,
        next_steps: None,
        additional_details: None,
    };

    let back: ReportData =
        serde_json::from_str(&serde_json::to_string(&report).unwrap()).unwrap();
    assert_eq!(back, report);
}

#[test]
fn optional_report_fields_are_omitted_when_absent() {
    let output = AgentOutput {
        summary: "ok".to_string(),
        charts: vec![],
        external_context: None,
        structured_report: None,
        insights: serde_json::Value::Null,
    };

    let json = serde_json::to_value(&output).unwrap();
    let obj = json.as_object().unwrap();
    assert!(!obj.contains_key("externalContext"));
    assert!(!obj.contains_key("structuredReport"));

    // And missing keys come back as None / Null.
    let back: AgentOutput =
        serde_json::from_str(r#"{"summary":"ok","charts":[]}"#).unwrap();
    assert!(back.external_context.is_none());
    assert!(back.structured_report.is_none());
    assert!(back.insights.is_null());
}
