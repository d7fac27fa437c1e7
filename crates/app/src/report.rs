//! What `sci-probe` prints.

use std::io::Write;

pub struct Queries<'a> {
    pub chars: &'a [usize],
    pub bytes: &'a [usize],
    pub lines: &'a [usize],
}

/// # Errors
///
/// Fails only if writing to `out` fails.
pub fn write_stats(
    out: &mut impl Write,
    path: &std::path::Path,
    editor: &editor_bridge::Editor,
) -> std::io::Result<()> {
    let (ascii_lines, longest) = editor.with_index(|index| {
        index.iter().fold((0usize, 0usize), |(ascii, longest), entry| {
            (
                ascii + usize::from(entry.metrics.is_ascii()),
                longest.max(entry.metrics.chars),
            )
        })
    });

    writeln!(out, "file:        {}", path.display())?;
    writeln!(out, "bytes:       {}", editor.byte_length())?;
    writeln!(out, "chars:       {}", editor.text_length())?;
    writeln!(out, "lines:       {}", editor.line_count())?;
    writeln!(out, "ascii lines: {ascii_lines}")?;
    writeln!(out, "longest:     {longest} chars")
}

/// # Errors
///
/// Fails only if writing to `out` fails.
pub fn write_queries(
    out: &mut impl Write,
    editor: &editor_bridge::Editor,
    queries: &Queries<'_>,
) -> std::io::Result<()> {
    for &pos in queries.chars {
        let byte = editor.char_to_byte(pos);

        writeln!(
            out,
            "char {pos} -> byte {byte} (line {})",
            editor.line_from_char_position(pos)
        )?;
    }

    for &pos in queries.bytes {
        let char_pos = editor.byte_to_char(pos);

        writeln!(
            out,
            "byte {pos} -> char {char_pos} (line {})",
            editor.line_from_char_position(char_pos)
        )?;
    }

    for &line in queries.lines {
        if line >= editor.line_count() {
            writeln!(out, "line {line}: past the last line ({})", editor.line_count() - 1)?;
            continue;
        }

        let start = editor.char_position_from_line(line);
        let len = editor.char_line_length(line);

        writeln!(
            out,
            "line {line}: chars {start}..{} {:?}",
            start + len,
            editor.line_text(line)
        )?;
    }

    Ok(())
}

/// # Errors
///
/// Fails only if writing to `out` fails.
pub fn write_module(
    out: &mut impl Write,
    config: &native::NativeConfig,
) -> std::io::Result<()> {
    let path = native::module_path::resolve(config);
    let state = if path.is_file() { "present" } else { "not extracted" };

    writeln!(out, "native:      {} ({state})", path.display())
}
