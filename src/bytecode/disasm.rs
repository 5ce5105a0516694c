use crate::bytecode::Bytecode;
use crate::bytecode::op::{Instruction, Opcode, Operator};
use std::collections::{BTreeSet, HashMap};

// =============================================================================
// Diagnostic dump
// =============================================================================

/// One line per instruction: `index<TAB>OPCODE<TAB>level<TAB>address`.
pub fn disassemble_to_string(bc: &Bytecode) -> String {
    let mut output = String::new();
    for (ip, ins) in bc.code.iter().enumerate() {
        output.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            ip,
            ins.opcode.name(),
            ins.level,
            ins.address
        ));
    }
    output
}

// =============================================================================
// Listing
// =============================================================================

/// Print an annotated listing of a bytecode program
pub fn print_bc(bc: &Bytecode) {
    println!("=== BYTECODE PROGRAM ===\n");
    print!("{}", listing_to_string(bc));
}

/// Annotated listing: jump targets and procedure entries are marked, and
/// operators are shown by name.
pub fn listing_to_string(bc: &Bytecode) -> String {
    let jump_targets = collect_jump_targets(bc);
    let entries = collect_entries(bc);
    let mut output = String::new();

    for (ip, ins) in bc.code.iter().enumerate() {
        if entries.contains(&ip) {
            output.push_str(&format!("      ┌── procedure @{:04}\n", ip));
        } else if jump_targets.contains(&ip) {
            output.push_str("      ┌──────────────────────────────────\n");
        }

        output.push_str(&format!("{:04} ", ip));
        if jump_targets.contains(&ip) || entries.contains(&ip) {
            output.push_str("► ");
        } else {
            output.push_str("  ");
        }

        output.push_str(&format_instruction(ins, ip));
        output.push('\n');
    }

    output
}

fn collect_jump_targets(bc: &Bytecode) -> BTreeSet<usize> {
    bc.code
        .iter()
        .filter(|ins| matches!(ins.opcode, Opcode::Jump | Opcode::JumpIfFalse))
        .map(|ins| ins.address as usize)
        .collect()
}

fn collect_entries(bc: &Bytecode) -> BTreeSet<usize> {
    bc.code
        .iter()
        .filter(|ins| ins.opcode == Opcode::Call)
        .map(|ins| ins.address as usize)
        .collect()
}

fn format_instruction(ins: &Instruction, ip: usize) -> String {
    match ins.opcode {
        Opcode::LoadConst => format!("LOAD_CONST     {}", ins.address),
        Opcode::LoadVar => format!("LOAD_VAR       {}, {}", ins.level, ins.address),
        Opcode::StoreVar => format!("STORE_VAR      {}, {}", ins.level, ins.address),
        Opcode::Call => format!("CALL           {}, @{:04}", ins.level, ins.address),
        Opcode::Enter => format!("ENTER          {}", ins.address),
        Opcode::Jump => format!("JUMP           {}", arrow(ip, ins.address)),
        Opcode::JumpIfFalse => format!("JUMP_IF_FALSE  {}", arrow(ip, ins.address)),
        Opcode::Operate => match Operator::from_code(ins.address) {
            Some(op) => format!("OPERATE        {}", op.name()),
            None => format!("OPERATE        ?{}", ins.address),
        },
    }
}

fn arrow(ip: usize, target: i64) -> String {
    if target <= ip as i64 {
        format!("↑ {:04}", target)
    } else {
        format!("↓ {:04}", target)
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Print bytecode statistics
pub fn print_bc_stats(bc: &Bytecode) {
    print!("{}", stats_to_string(bc));
}

pub fn stats_to_string(bc: &Bytecode) -> String {
    let mut output = String::from("=== BYTECODE STATISTICS ===\n\n");
    output.push_str(&format!("Instructions:     {}\n", bc.len()));
    output.push_str(&format!("Procedures:       {}\n\n", collect_entries(bc).len()));

    let mut counts: Vec<(Opcode, usize)> = op_counts(bc).into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.name().cmp(b.0.name())));

    output.push_str("Opcode frequency:\n");
    for (opcode, count) in counts {
        let pct = (count as f64 / bc.len().max(1) as f64) * 100.0;
        output.push_str(&format!(
            "  {:<14} {:>4} ({:>5.1}%)\n",
            opcode.name(),
            count,
            pct
        ));
    }
    output
}

fn op_counts(bc: &Bytecode) -> HashMap<Opcode, usize> {
    let mut counts = HashMap::new();
    for ins in &bc.code {
        *counts.entry(ins.opcode).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bytecode {
        Bytecode {
            code: vec![
                Instruction::new(Opcode::Enter, 0, 4),
                Instruction::new(Opcode::Call, 0, 5),
                Instruction::new(Opcode::LoadVar, 0, 0),
                Instruction::new(Opcode::JumpIfFalse, 0, 4),
                Instruction::new(Opcode::Operate, 0, 0),
                Instruction::new(Opcode::Enter, 0, 3),
                Instruction::new(Opcode::Operate, 0, 0),
            ],
        }
    }

    #[test]
    fn test_dump_is_tab_separated() {
        let dump = disassemble_to_string(&sample());
        let lines: Vec<&str> = dump.lines().collect();

        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "0\tENTER\t0\t4");
        assert_eq!(lines[1], "1\tCALL\t0\t5");
        assert_eq!(lines[3], "3\tJUMP_IF_FALSE\t0\t4");
        assert_eq!(lines[6], "6\tOPERATE\t0\t0");
    }

    #[test]
    fn test_listing_marks_targets_and_operators() {
        let listing = listing_to_string(&sample());

        assert!(listing.contains("0004 ► OPERATE        RET"));
        assert!(listing.contains("┌── procedure @0005"));
        assert!(listing.contains("JUMP_IF_FALSE  ↓ 0004"));
        assert!(listing.contains("CALL           0, @0005"));
    }

    #[test]
    fn test_listing_unknown_operator() {
        let bc = Bytecode {
            code: vec![Instruction::new(Opcode::Operate, 0, 99)],
        };
        assert!(listing_to_string(&bc).contains("OPERATE        ?99"));
    }

    #[test]
    fn test_stats() {
        let stats = stats_to_string(&sample());
        assert!(stats.contains("Instructions:     7"));
        assert!(stats.contains("Procedures:       1"));
        assert!(stats.contains("ENTER             2"));
    }

    #[test]
    fn test_op_counts() {
        let counts = op_counts(&sample());
        assert_eq!(counts.get(&Opcode::Enter), Some(&2));
        assert_eq!(counts.get(&Opcode::Operate), Some(&2));
        assert_eq!(counts.get(&Opcode::Jump), None);
    }
}
