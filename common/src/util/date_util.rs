///
/// 生成当前时间字符串（响应 meta 用，RFC3339）
pub fn build_time() -> String {
    let now = chrono::Local::now();
    now.to_rfc3339()
}
pub fn now() -> i64 {
    let now = chrono::Local::now();
    now.timestamp()
}
