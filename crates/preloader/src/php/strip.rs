//! Comment removal on the syntax tree.

use super::{
    SyntaxError,
    tree::{OPAQUE_KINDS, SourceTree, walk},
};

#[derive(Debug, Clone, Copy)]
enum Span {
    Comment { newline: bool },
    Verbatim,
}

/// Removes every comment and doc comment and collapses the whitespace runs
/// around them. A run that spanned a line break becomes a single newline,
/// any other run a single space. Strings, heredocs, inline HTML and data
/// after `__halt_compiler();` are copied as they are.
pub fn strip_comments(source: &str) -> Result<String, SyntaxError> {
    let tree = SourceTree::parse(source)?;
    let code = tree.code();

    let mut spans = Vec::new();
    walk(tree.root(), &mut |node| {
        let kind = node.kind();
        if kind == "comment" {
            // line comments may own the line break that ends them
            let newline = tree.text(node).ends_with('\n');
            spans.push((node.start_byte(), node.end_byte(), Span::Comment { newline }));
            false
        } else if OPAQUE_KINDS.contains(&kind) {
            spans.push((node.start_byte(), node.end_byte(), Span::Verbatim));
            false
        } else {
            true
        }
    });

    let mut out = String::with_capacity(source.len());
    // whether the pending whitespace run contains a newline
    let mut pending: Option<bool> = None;
    // html in front of the first node is output as written
    let mut pos = tree.root().child(0).map_or(0, |node| node.start_byte());
    out.push_str(&code[..pos]);
    for (start, end, span) in spans {
        if start < pos {
            continue;
        }
        push_code(&mut out, &mut pending, &code[pos..start]);
        match span {
            Span::Comment { newline } => pending = Some(pending.unwrap_or(false) || newline),
            Span::Verbatim => {
                flush(&mut out, &mut pending);
                out.push_str(&code[start..end]);
            }
        }
        pos = end;
    }
    push_code(&mut out, &mut pending, &code[pos..]);
    flush(&mut out, &mut pending);

    if let Some(data) = tree.halt_data() {
        out.push_str(data);
    }
    Ok(out)
}

fn push_code(out: &mut String, pending: &mut Option<bool>, text: &str) {
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            *pending = Some(pending.unwrap_or(false) || ch == '\n');
        } else {
            flush(out, pending);
            out.push(ch);
        }
    }
}

/// Emits the pending whitespace run, unless the output already ends in
/// whitespace.
fn flush(out: &mut String, pending: &mut Option<bool>) {
    if let Some(newline) = pending.take()
        && !out.ends_with(|c: char| c.is_ascii_whitespace())
    {
        out.push(if newline { '\n' } else { ' ' });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_removes_comments() {
        let source = "<?php\n/**\n * Doc.\n */\nclass A\n{\n    // line\n    public $b = 1; # hash\n\n    /* block */ public $c = 2;\n}\n";
        assert_eq!(
            strip_comments(source).unwrap(),
            "<?php\nclass A\n{\npublic $b = 1;\npublic $c = 2;\n}\n"
        );
    }

    #[test]
    fn test_comment_between_tokens_keeps_them_apart() {
        assert_eq!(
            strip_comments("<?php return/**/1;").unwrap(),
            "<?php return 1;"
        );
    }

    #[test]
    fn test_strings_and_html_are_untouched() {
        let source = "<html> // not a comment\n<?php echo '/* x */', \"# y\"; ?>\n  <p>  </p>";
        assert_eq!(strip_comments(source).unwrap(), source);
    }

    #[test]
    fn test_leading_html_whitespace_is_kept() {
        let source = "\n  <p>x</p>\n<?php echo 1;";
        assert_eq!(strip_comments(source).unwrap(), source);
    }

    #[test]
    fn test_heredoc_whitespace_is_kept() {
        let source = "<?php\n$a = <<<EOT\n  one  // two\n\n  three\nEOT;\n";
        assert_eq!(strip_comments(source).unwrap(), source);
    }

    #[test]
    fn test_attributes_survive() {
        assert_eq!(
            strip_comments("<?php #[Pure] function f() {}").unwrap(),
            "<?php #[Pure] function f() {}"
        );
    }

    #[test]
    fn test_halt_compiler_data_is_untouched() {
        let source = "<?php\n// go\n__halt_compiler(); /* data */ 'x";
        assert_eq!(
            strip_comments(source).unwrap(),
            "<?php\n__halt_compiler(); /* data */ 'x"
        );
    }
}
