use ammonia;

/// Sanitize admin-supplied question/option text before it is stored.
///
/// Whitelist-based: safe inline tags (<b>, <i>, ...) survive, <script>
/// and event-handler attributes do not. Quiz text is echoed back to every
/// taker, so it must never carry live markup.
pub fn sanitize_text(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags() {
        let cleaned = sanitize_text("What is 2+2?<script>alert(1)</script>");
        assert_eq!(cleaned, "What is 2+2?");
    }

    #[test]
    fn keeps_plain_text() {
        assert_eq!(sanitize_text("Plain question"), "Plain question");
    }
}
