use validator::ValidationErrors;

/// ✅ 把 validator 的字段错误压成一条消息（对齐统一信封的 error 字段）
pub fn flatten_errors(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut parts: Vec<String> = field_errors
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    parts.sort();
    parts.join(", ")
}
