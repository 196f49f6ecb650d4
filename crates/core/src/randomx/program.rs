//! Decoding of the 256-instruction VM program.
//!
//! Each instruction is eight bytes: opcode, dst, src, mod and a 32-bit
//! immediate. The opcode byte selects the instruction through a frequency
//! table; register choices, memory masks and branch targets are all
//! resolved here so the interpreter only has to execute.

use super::superscalar::{reciprocal, sign_extend};
use crate::codec::{read_u32_le, read_u64_le};

pub(crate) const PROGRAM_SIZE: usize = 256;

/// Configuration words at the head of the program buffer.
pub(crate) const ENTROPY_WORDS: usize = 16;

/// Program buffer length: 128 bytes of entropy then the instructions.
pub(crate) const PROGRAM_BYTES: usize = ENTROPY_WORDS * 8 + PROGRAM_SIZE * 8;

const L1_SIZE: u64 = 16 * 1024;

const CONDITION_OFFSET: u32 = 8;
const STORE_L3_CONDITION: u8 = 14;
/// FSCAL_R flips the sign and four exponent bits.
pub(crate) const FSCAL_MASK: u64 = 0x80F0_0000_0000_0000;

/// Opcode frequencies in decode order; they sum to 256.
#[rustfmt::skip]
const FREQUENCIES: [(Opcode, u16); 29] = [
    (Opcode::IAddRs, 16), (Opcode::IAddM, 7), (Opcode::ISubR, 16), (Opcode::ISubM, 7),
    (Opcode::IMulR, 16), (Opcode::IMulM, 4), (Opcode::IMulhR, 4), (Opcode::IMulhM, 1),
    (Opcode::ISmulhR, 4), (Opcode::ISmulhM, 1), (Opcode::IMulRcp, 8), (Opcode::INegR, 2),
    (Opcode::IXorR, 15), (Opcode::IXorM, 5), (Opcode::IRorR, 8), (Opcode::IRolR, 2),
    (Opcode::ISwapR, 4),
    (Opcode::FSwapR, 4), (Opcode::FAddR, 16), (Opcode::FAddM, 5), (Opcode::FSubR, 16),
    (Opcode::FSubM, 5), (Opcode::FScalR, 6), (Opcode::FMulR, 32), (Opcode::FDivM, 4),
    (Opcode::FSqrtR, 6),
    (Opcode::CBranch, 25), (Opcode::CFround, 1), (Opcode::IStore, 16),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opcode {
    IAddRs,
    IAddM,
    ISubR,
    ISubM,
    IMulR,
    IMulM,
    IMulhR,
    IMulhM,
    ISmulhR,
    ISmulhM,
    IMulRcp,
    INegR,
    IXorR,
    IXorM,
    IRorR,
    IRolR,
    ISwapR,
    FSwapR,
    FAddR,
    FAddM,
    FSubR,
    FSubM,
    FScalR,
    FMulR,
    FDivM,
    FSqrtR,
    CBranch,
    CFround,
    IStore,
}

/// Opcode byte to instruction, expanded from [`FREQUENCIES`].
const OPCODE_TABLE: [Opcode; 256] = {
    let mut table = [Opcode::IAddRs; 256];
    let mut i = 0;
    let mut entry = 0;
    while entry < FREQUENCIES.len() {
        let (op, count) = FREQUENCIES[entry];
        let mut n = 0;
        while n < count {
            table[i] = op;
            i += 1;
            n += 1;
        }
        entry += 1;
    }
    table
};

/// Scratchpad address masks for one variant, each aligned to 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Masks {
    pub(crate) l1: u64,
    pub(crate) l2: u64,
    pub(crate) l3: u64,
}

impl Masks {
    pub(crate) fn new(l2_size: usize, l3_size: usize) -> Self {
        let mask = |size: u64| (size / 8 - 1) * 8;
        Self {
            l1: mask(L1_SIZE),
            l2: mask(l2_size as u64),
            l3: mask(l3_size as u64),
        }
    }
}

/// Integer operand: a register or a sign-extended immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operand {
    Reg(usize),
    Imm(u64),
}

/// Scratchpad operand at `(base + imm) & mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mem {
    pub(crate) base: Option<usize>,
    pub(crate) imm: u64,
    pub(crate) mask: u64,
}

/// Decoded instruction. Integer registers are `0..8`; float groups are
/// `0..4` except for FSWAP_R, which addresses f0..f3 then e0..e3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Instr {
    IAddRs { dst: usize, src: usize, shift: u32, imm: u64 },
    IAddM { dst: usize, mem: Mem },
    ISubR { dst: usize, src: Operand },
    ISubM { dst: usize, mem: Mem },
    IMulR { dst: usize, src: Operand },
    IMulM { dst: usize, mem: Mem },
    IMulhR { dst: usize, src: usize },
    IMulhM { dst: usize, mem: Mem },
    ISmulhR { dst: usize, src: usize },
    ISmulhM { dst: usize, mem: Mem },
    INegR { dst: usize },
    IXorR { dst: usize, src: Operand },
    IXorM { dst: usize, mem: Mem },
    IRorR { dst: usize, src: Operand },
    IRolR { dst: usize, src: Operand },
    ISwapR { dst: usize, src: usize },
    FSwapR { dst: usize },
    FAddR { dst: usize, src: usize },
    FAddM { dst: usize, mem: Mem },
    FSubR { dst: usize, src: usize },
    FSubM { dst: usize, mem: Mem },
    FScalR { dst: usize },
    FMulR { dst: usize, src: usize },
    FDivM { dst: usize, mem: Mem },
    FSqrtR { dst: usize },
    /// Jump to `resume` when the bits of `dst` under `mask` are all zero.
    CBranch { dst: usize, imm: u64, mask: u64, resume: usize },
    CFround { src: usize, rotate: u32 },
    IStore { mem: Mem, src: usize },
    Nop,
}

pub(crate) struct Program {
    pub(crate) entropy: [u64; ENTROPY_WORDS],
    pub(crate) code: Vec<Instr>,
}

impl Program {
    /// Decode a [`PROGRAM_BYTES`] buffer produced by the 4-round AES
    /// generator.
    pub(crate) fn decode(bytes: &[u8], masks: Masks) -> Self {
        let mut entropy = [0u64; ENTROPY_WORDS];
        for (i, word) in entropy.iter_mut().enumerate() {
            *word = read_u64_le(bytes, i * 8);
        }

        // Last instruction that wrote each register, for branch targets.
        let mut last_write: [Option<usize>; 8] = [None; 8];
        let mut code = Vec::with_capacity(PROGRAM_SIZE);

        for (pc, raw) in bytes[ENTROPY_WORDS * 8..PROGRAM_BYTES]
            .chunks_exact(8)
            .enumerate()
        {
            let opcode = OPCODE_TABLE[raw[0] as usize];
            let dst = raw[1] as usize % 8;
            let src = raw[2] as usize % 8;
            let modifier = raw[3];
            let imm32 = read_u32_le(raw, 4);
            let imm = sign_extend(imm32);

            let mem_mask = if modifier % 4 != 0 { masks.l1 } else { masks.l2 };
            // Memory operand; reading through dst itself means an absolute L3 address.
            let load = || {
                if src == dst {
                    Mem {
                        base: None,
                        imm,
                        mask: masks.l3,
                    }
                } else {
                    Mem {
                        base: Some(src),
                        imm,
                        mask: mem_mask,
                    }
                }
            };
            let operand = |raw_imm: u64| {
                if src == dst {
                    Operand::Imm(raw_imm)
                } else {
                    Operand::Reg(src)
                }
            };
            let float_load = Mem {
                base: Some(src),
                imm,
                mask: mem_mask,
            };

            let instr = match opcode {
                Opcode::IAddRs => Instr::IAddRs {
                    dst,
                    src,
                    shift: u32::from((modifier >> 2) % 4),
                    imm: if dst == 5 { imm } else { 0 },
                },
                Opcode::IAddM => Instr::IAddM { dst, mem: load() },
                Opcode::ISubR => Instr::ISubR { dst, src: operand(imm) },
                Opcode::ISubM => Instr::ISubM { dst, mem: load() },
                Opcode::IMulR => Instr::IMulR { dst, src: operand(imm) },
                Opcode::IMulM => Instr::IMulM { dst, mem: load() },
                Opcode::IMulhR => Instr::IMulhR { dst, src },
                Opcode::IMulhM => Instr::IMulhM { dst, mem: load() },
                Opcode::ISmulhR => Instr::ISmulhR { dst, src },
                Opcode::ISmulhM => Instr::ISmulhM { dst, mem: load() },
                Opcode::IMulRcp if imm32 != 0 && !imm32.is_power_of_two() => Instr::IMulR {
                    dst,
                    src: Operand::Imm(reciprocal(imm32)),
                },
                Opcode::IMulRcp => Instr::Nop,
                Opcode::INegR => Instr::INegR { dst },
                Opcode::IXorR => Instr::IXorR { dst, src: operand(imm) },
                Opcode::IXorM => Instr::IXorM { dst, mem: load() },
                Opcode::IRorR => Instr::IRorR { dst, src: operand(u64::from(imm32)) },
                Opcode::IRolR => Instr::IRolR { dst, src: operand(u64::from(imm32)) },
                Opcode::ISwapR if src != dst => Instr::ISwapR { dst, src },
                Opcode::ISwapR => Instr::Nop,
                Opcode::FSwapR => Instr::FSwapR { dst },
                Opcode::FAddR => Instr::FAddR { dst: dst % 4, src: src % 4 },
                Opcode::FAddM => Instr::FAddM { dst: dst % 4, mem: float_load },
                Opcode::FSubR => Instr::FSubR { dst: dst % 4, src: src % 4 },
                Opcode::FSubM => Instr::FSubM { dst: dst % 4, mem: float_load },
                Opcode::FScalR => Instr::FScalR { dst: dst % 4 },
                Opcode::FMulR => Instr::FMulR { dst: dst % 4, src: src % 4 },
                Opcode::FDivM => Instr::FDivM { dst: dst % 4, mem: float_load },
                Opcode::FSqrtR => Instr::FSqrtR { dst: dst % 4 },
                Opcode::CBranch => {
                    let shift = u32::from(modifier >> 4) + CONDITION_OFFSET;
                    let imm = (imm | (1 << shift)) & !(1 << (shift - 1));
                    Instr::CBranch {
                        dst,
                        imm,
                        mask: 0xff << shift,
                        resume: last_write[dst].map_or(0, |target| target + 1),
                    }
                }
                Opcode::CFround => Instr::CFround {
                    src,
                    rotate: imm32 & 63,
                },
                Opcode::IStore => Instr::IStore {
                    mem: Mem {
                        base: Some(dst),
                        imm,
                        mask: if modifier >> 4 >= STORE_L3_CONDITION {
                            masks.l3
                        } else {
                            mem_mask
                        },
                    },
                    src,
                },
            };

            match instr {
                Instr::CBranch { .. } => last_write = [Some(pc); 8],
                Instr::ISwapR { dst, src } => {
                    last_write[dst] = Some(pc);
                    last_write[src] = Some(pc);
                }
                Instr::IAddRs { dst, .. }
                | Instr::IAddM { dst, .. }
                | Instr::ISubR { dst, .. }
                | Instr::ISubM { dst, .. }
                | Instr::IMulR { dst, .. }
                | Instr::IMulM { dst, .. }
                | Instr::IMulhR { dst, .. }
                | Instr::IMulhM { dst, .. }
                | Instr::ISmulhR { dst, .. }
                | Instr::ISmulhM { dst, .. }
                | Instr::INegR { dst }
                | Instr::IXorR { dst, .. }
                | Instr::IXorM { dst, .. }
                | Instr::IRorR { dst, .. }
                | Instr::IRolR { dst, .. } => last_write[dst] = Some(pc),
                _ => {}
            }
            code.push(instr);
        }

        Self { entropy, code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASKS: Masks = Masks {
        l1: 0x3ff8,
        l2: 0x3fff8,
        l3: 0x1ffff8,
    };

    fn single(op: u8, dst: u8, src: u8, modifier: u8, imm: u32) -> Vec<u8> {
        let mut bytes = vec![0u8; PROGRAM_BYTES];
        let at = ENTROPY_WORDS * 8;
        bytes[at..at + 4].copy_from_slice(&[op, dst, src, modifier]);
        bytes[at + 4..at + 8].copy_from_slice(&imm.to_le_bytes());
        bytes
    }

    fn first(bytes: &[u8]) -> Instr {
        Program::decode(bytes, MASKS).code[0]
    }

    #[test]
    fn test_frequency_table_covers_every_opcode_byte() {
        let total: u16 = FREQUENCIES.iter().map(|&(_, n)| n).sum();
        assert_eq!(total, 256);
        assert_eq!(OPCODE_TABLE[0], Opcode::IAddRs);
        assert_eq!(OPCODE_TABLE[16], Opcode::IAddM);
        assert_eq!(OPCODE_TABLE[255], Opcode::IStore);
        assert_eq!(OPCODE_TABLE[214], Opcode::CBranch);
        assert_eq!(OPCODE_TABLE[239], Opcode::CFround);
    }

    #[test]
    fn test_masks_for_default_variant() {
        assert_eq!(Masks::new(262_144, 2_097_152), MASKS);
    }

    #[test]
    fn test_memory_operand_forms() {
        // IADD_M with mod % 4 == 0 reads L2, otherwise L1.
        assert_eq!(
            first(&single(16, 1, 2, 0, 8)),
            Instr::IAddM {
                dst: 1,
                mem: Mem { base: Some(2), imm: 8, mask: MASKS.l2 }
            }
        );
        assert_eq!(
            first(&single(16, 1, 2, 1, 8)),
            Instr::IAddM {
                dst: 1,
                mem: Mem { base: Some(2), imm: 8, mask: MASKS.l1 }
            }
        );
        assert_eq!(
            first(&single(16, 3, 3, 1, 0xffff_fff8)),
            Instr::IAddM {
                dst: 3,
                mem: Mem { base: None, imm: 0xffff_ffff_ffff_fff8, mask: MASKS.l3 }
            }
        );
    }

    #[test]
    fn test_register_aliasing_uses_immediate() {
        assert_eq!(
            first(&single(23, 4, 12, 0, 0x8000_0000)),
            Instr::ISubR { dst: 4, src: Operand::Imm(0xffff_ffff_8000_0000) }
        );
        // Rotations take the raw immediate.
        assert_eq!(
            first(&single(106, 4, 12, 0, 0x8000_0021)),
            Instr::IRorR { dst: 4, src: Operand::Imm(0x8000_0021) }
        );
    }

    #[test]
    fn test_degenerate_forms_become_nops() {
        // IMUL_RCP by a power of two, ISWAP_R with itself.
        assert_eq!(first(&single(83, 0, 0, 0, 1 << 20)), Instr::Nop);
        assert_eq!(first(&single(83, 0, 0, 0, 0)), Instr::Nop);
        assert_eq!(first(&single(116, 6, 6, 0, 0)), Instr::Nop);
        assert_eq!(
            first(&single(83, 2, 0, 0, 3)),
            Instr::IMulR { dst: 2, src: Operand::Imm(12297829382473034410) }
        );
    }

    #[test]
    fn test_branch_targets_follow_last_write() {
        let mut bytes = single(0, 3, 1, 0, 0);
        let at = ENTROPY_WORDS * 8;
        // pc 1: FADD_R (no integer write), pc 2: CBRANCH on r3, pc 3: CBRANCH on r3.
        bytes[at + 8] = 124;
        bytes[at + 16..at + 20].copy_from_slice(&[0xe0, 3, 0, 0x30]);
        bytes[at + 24..at + 28].copy_from_slice(&[0xe0, 3, 0, 0]);
        let program = Program::decode(&bytes, MASKS);
        assert_eq!(
            program.code[2],
            Instr::CBranch { dst: 3, imm: 1 << 11, mask: 0xff << 11, resume: 1 }
        );
        assert!(matches!(program.code[3], Instr::CBranch { resume: 3, .. }));
        // Registers never written branch to the start.
        assert!(matches!(program.code[4], Instr::IAddRs { .. }));
    }
}
