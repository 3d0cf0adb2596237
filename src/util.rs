/// Render whole seconds as `m:ss`; minutes grow without padding
pub fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
