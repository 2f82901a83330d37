//! Disassembler for RPU programs.
//!
//! Converts raw image bytes back to readable assembly.

use crate::cpu::decode::{decode, INSTRUCTION_WIDTH};

/// Disassemble a single instruction word to text.
pub fn disassemble_instruction(word: [u8; 2]) -> String {
    decode(word).to_string()
}

/// Disassemble an image, one line per 2-byte word.
pub fn disassemble(image: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; RPU Disassembly\n");
    output.push_str("; ---------------\n\n");

    let mut chunks = image.chunks_exact(INSTRUCTION_WIDTH);
    for (i, chunk) in chunks.by_ref().enumerate() {
        let word = [chunk[0], chunk[1]];
        output.push_str(&format!(
            "{:04x}: {}  ; {:02x} {:02x}\n",
            i * INSTRUCTION_WIDTH,
            disassemble_instruction(word),
            word[0],
            word[1]
        ));
    }

    // Odd trailing byte can't form an instruction
    if let [last] = chunks.remainder() {
        output.push_str(&format!(
            "{:04x}: DB {:#04x}\n",
            image.len() - 1,
            last
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{encode, Instruction};

    #[test]
    fn test_disassemble_load() {
        let load = encode(&Instruction::load(5).unwrap());
        assert_eq!(disassemble_instruction(load), "LOAD 0x0005");
    }

    #[test]
    fn test_disassemble_store() {
        assert_eq!(disassemble_instruction([0xFF, 0xFF]), "STORE 0x7fff");
    }

    #[test]
    fn test_disassemble_listing() {
        let listing = disassemble(&[0x00, 0x05, 0x80, 0x00, 0x2A]);
        assert!(listing.contains("0000: LOAD 0x0005  ; 00 05"));
        assert!(listing.contains("0002: STORE 0x0000  ; 80 00"));
        assert!(listing.contains("0004: DB 0x2a"));
    }
}
