use serde_json::Value;

/// Print just the headline value from the output.
///
/// Looks for well-known result fields in priority order, descending into
/// the portfolio section of build and KPI snapshot results, then falls back
/// to the row count of a row list or the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "region",
        "default_rate_pct",
        "customer_risk_score",
        "outstanding_balance",
    ];

    if let Value::Array(rows) = result_obj {
        println!("{}", rows.len());
        return;
    }

    if let Value::Object(map) = result_obj {
        let scopes = [map.get("portfolio").and_then(Value::as_object), Some(map)];
        for scope in scopes.into_iter().flatten() {
            for key in &priority_keys {
                if let Some(val) = scope.get(*key).filter(|v| !v.is_null()) {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
