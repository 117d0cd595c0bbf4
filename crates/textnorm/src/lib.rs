/// Canonicalizes line endings and indentation of a generated tool module.
///
/// CRLF sequences become LF. If the text's inferred indentation unit is 4
/// spaces, every leading run of `4k + r` spaces is narrowed to `2k + r`;
/// text that is already narrow (unit below 4) only gets the line-ending
/// conversion, so re-running on normalized output is a no-op.
pub fn normalize(text: &str) -> String {
    let unix = text.replace("\r\n", "\n");
    if !has_wide_indent(&unix) {
        return unix;
    }

    let lines: Vec<&str> = unix.split('\n').collect();
    let mut out = String::with_capacity(unix.len());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let spaces = leading_spaces(line);
        if spaces == 0 {
            out.push_str(line);
            continue;
        }
        let level = spaces / 4;
        let remainder = spaces % 4;
        for _ in 0..(level * 2 + remainder) {
            out.push(' ');
        }
        out.push_str(&line[spaces..]);
    }
    out
}

fn leading_spaces(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

// Unit inference: the smallest positive leading-space run over lines that
// carry content. Blank and whitespace-only lines don't vote.
fn has_wide_indent(text: &str) -> bool {
    text.split('\n')
        .filter_map(|line| {
            let spaces = leading_spaces(line);
            if spaces > 0 && !line[spaces..].trim().is_empty() {
                Some(spaces)
            } else {
                None
            }
        })
        .min()
        .is_some_and(|min| min >= 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_crlf_to_lf() {
        assert_eq!(normalize("a\r\nb\r\n"), "a\nb\n");
    }

    #[test]
    fn narrows_four_space_indentation() {
        let input = "function f() {\n    if (x) {\n        return 1;\n    }\n}\n";
        let expected = "function f() {\n  if (x) {\n    return 1;\n  }\n}\n";
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn preserves_remainder_spaces() {
        // 4k + r leading spaces become 2k + r: 10 = 4*2 + 2 -> 6.
        let input = "top\n    a\n          b\n";
        assert_eq!(normalize(input), "top\n  a\n      b\n");
    }

    #[test]
    fn leaves_two_space_text_unchanged() {
        let input = "function f() {\n  if (x) {\n    return 1;\n  }\n}\n";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn is_idempotent_on_its_own_output() {
        let input = "a\r\n    b\n        c\n";
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn ignores_unindented_and_blank_lines() {
        let input = "no indent\n\n    wide\n";
        assert_eq!(normalize(input), "no indent\n\n  wide\n");
    }

    #[test]
    fn whitespace_only_lines_do_not_vote_for_the_unit() {
        // The two-space blank-ish line would otherwise mask the 4-space unit.
        let input = "top\n  \n    body\n";
        assert_eq!(normalize(input), "top\n  \n  body\n");
    }

    #[test]
    fn leaves_tab_indented_lines_alone() {
        let input = "top\n\tindented\n    wide\n";
        let out = normalize(input);
        assert!(out.contains("\n\tindented\n"));
        assert!(out.contains("\n  wide\n"));
    }
}
