use std::fmt::Write;

/// Bytes shown on each line of a hex block.
const LINE_WIDTH: usize = 16;

/// Nicely format the given bytes as a hex block. The listed addresses will
/// start from `start`, e.g.
///
/// ```text
/// 0x0080    C3 5C D3 C3  58 D3 7F 00  |.\..X...|
/// ```
pub fn pretty_print_hex_block(buf: &[u8], start: usize) -> String {
    // Each full line is a 6-character address, 4 spaces, 50 characters of
    // bytes, 3 characters of padding and bar, 16 of ASCII, one bar and a
    // newline: 81 bytes.
    let mut out = String::with_capacity((buf.len() / LINE_WIDTH + 1) * 81);
    for (line, chunk) in buf.chunks(LINE_WIDTH).enumerate() {
        if line != 0 {
            out.push('\n');
        }
        write!(out, "{:#06X}    ", start + line * LINE_WIDTH).unwrap();
        let mut hex = String::with_capacity(3 * LINE_WIDTH);
        for (i, byte) in chunk.iter().enumerate() {
            if i != 0 {
                // Group the bytes in fours.
                hex.push_str(if i % 4 == 0 { "  " } else { " " });
            }
            write!(hex, "{:02X}", byte).unwrap();
        }
        // Pad short lines so the ASCII column stays aligned.
        write!(out, "{:<50}  |", hex).unwrap();
        out.extend(chunk.iter().map(|&b| printable(b)));
        out.push('|');
    }
    out
}

fn printable(chr: u8) -> char {
    match chr {
        32..=126 => chr.into(),
        _ => '.',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let block = pretty_print_hex_block(b"CP/M", 0x80);
        assert!(block.starts_with("0x0080    43 50 2F 4D"));
        assert!(block.ends_with("|CP/M|"));
        assert!(!block.contains('\n'));
    }

    #[test]
    fn test_full_sector() {
        let sector: Vec<u8> = (0..128).collect();
        let block = pretty_print_hex_block(&sector, 0);
        let lines: Vec<_> = block.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[1].starts_with("0x0010    10 11 12 13  14 15 16 17"));
        // Control characters are replaced, printable ones are kept.
        assert!(lines[0].ends_with("|................|"));
        assert!(lines[2].ends_with("| !\"#$%&'()*+,-./|"));
        // Every line has the same width.
        assert!(lines.iter().all(|l| l.len() == lines[0].len()));
    }

    #[test]
    fn test_partial_line_is_aligned() {
        let block = pretty_print_hex_block(&[0x41; 20], 0);
        let lines: Vec<_> = block.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].find('|'), lines[1].find('|'));
        assert!(lines[1].ends_with("|AAAA|"));
    }
}
