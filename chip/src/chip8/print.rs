//! The pretty print implementation of the [`Machine`](super::Machine), a dump of the registers,
//! timers, keyboard, stack and the full memory.

use std::fmt;

use once_cell::sync::Lazy;

use super::Machine;
use crate::{definitions::cpu, opcode::Instruction};

/// The amount of entries per row, as a single instruction is u16
/// a memory row covers twice as many bytes
const HEX_PRINT_STEP: usize = 8;

const END_OF_LINE: char = '\n';
const INDENT_FILLAMENT: char = '\t';
const INDENT_SIZE: usize = 2;

/// Will add an indent post processing
fn indent_helper(text: &mut String, indent: usize) {
    for _ in 0..indent {
        text.push(INDENT_FILLAMENT);
    }
}

/// The formatted string will be 2 symbols for the prefix (0x)
/// and 4 for the rest long.
macro_rules! intformat {
    () => {
        "{:#06X}"
    };
}

static POINTER_LEN: Lazy<usize> = Lazy::new(|| {
    let mut line = String::with_capacity(20);
    match pointer_print::formatter(&mut line, 0, 0) {
        Ok(()) => line.len(),
        Err(_) => 0,
    }
});

static INTEGER_LEN: Lazy<usize> = Lazy::new(|| {
    let mut line = String::new();
    match integer_print::formatter(&mut line, 0u8) {
        Ok(()) => line.len(),
        Err(_) => 0,
    }
});

/// A line length (this is a bit bigger than the actual line will be)
static LENLINE: Lazy<usize> =
    Lazy::new(|| INDENT_SIZE + HEX_PRINT_STEP * (*INTEGER_LEN + 1) + 1 + *POINTER_LEN);

/// Handles all the printing of the pointer values.
mod pointer_print {
    use std::fmt::{self, Write};

    /// will format the pointers according to definition
    pub(super) fn formatter(line: &mut String, from: usize, to: usize) -> fmt::Result {
        write!(line, concat!(intformat!(), " - ", intformat!(), " :"), from, to)
    }
}

/// handles printing of any and all of integers.
mod integer_print {
    use super::{pointer_print, END_OF_LINE, HEX_PRINT_STEP};
    use num_traits::Unsigned;
    use std::fmt::{self, Write};

    /// will format all integer types
    pub(super) fn formatter<T>(line: &mut String, data: T) -> fmt::Result
    where
        T: fmt::UpperHex + Unsigned + Copy,
    {
        write!(line, intformat!(), data)
    }

    /// will pretty print all the integer data given
    pub(super) fn printer<T>(data: &[T], indent: usize) -> Result<String, fmt::Error>
    where
        T: fmt::UpperHex + Unsigned + Copy,
    {
        let mut res = String::with_capacity(*super::LENLINE * (data.len() / HEX_PRINT_STEP + 1));
        for i in (0..data.len()).step_by(HEX_PRINT_STEP) {
            let n = (i + HEX_PRINT_STEP - 1).min(data.len() - 1);

            super::indent_helper(&mut res, indent);
            pointer_print::formatter(&mut res, i, n)?;

            for entry in &data[i..=n] {
                res.push(' ');
                formatter(&mut res, *entry)?;
            }
            res.push(END_OF_LINE);
        }

        // Remove unneeded new line
        if res.ends_with(END_OF_LINE) {
            res.pop();
        }
        Ok(res)
    }
}

/// Handles all the boolean data types.
mod bool_print {
    use super::{pointer_print, END_OF_LINE, HEX_PRINT_STEP};
    use std::fmt;

    /// a function to keep the correct format length
    fn formatter(value: bool) -> String {
        format!("{:<width$}", value, width = *super::INTEGER_LEN)
    }

    /// will pretty print all the boolean data given
    /// the offset will be calculated automatically from
    /// the data block
    pub(super) fn printer(data: &[bool], indent: usize) -> Result<String, fmt::Error> {
        let mut res = String::with_capacity(*super::LENLINE * (data.len() / HEX_PRINT_STEP + 1));

        for i in (0..data.len()).step_by(HEX_PRINT_STEP) {
            let n = (i + HEX_PRINT_STEP - 1).min(data.len() - 1);
            super::indent_helper(&mut res, indent);
            pointer_print::formatter(&mut res, i, n)?;

            let line = data[i..=n]
                .iter()
                .map(|value| formatter(*value))
                .collect::<Vec<_>>()
                .join(" ");
            res.push(' ');
            res.push_str(line.trim_end());
            res.push(END_OF_LINE);
        }
        if res.ends_with(END_OF_LINE) {
            res.pop();
        }
        Ok(res)
    }
}

/// Handles the memory, printed as opcodes.
mod opcode_print {
    use super::{integer_print, pointer_print, END_OF_LINE, HEX_PRINT_STEP};
    use crate::{
        definitions::memory,
        opcode::{self, Opcode},
    };
    use once_cell::sync::Lazy;
    use std::fmt::{self, Write};

    /// The internal length of the given data
    /// as the data is stored as u8 and an opcode
    /// is u16 long
    const POINTER_INCREMENT: usize = HEX_PRINT_STEP * memory::opcodes::SIZE as usize;
    /// The values that are used when there are at least two rows of zeros.
    const FILLER_BASE: &str = "...";

    /// Prepares the line that will be used, in the case that a row holds only zeros.
    static ZERO_FILLER: Lazy<String> = Lazy::new(|| {
        let mut formatted = String::new();
        if integer_print::formatter(&mut formatted, 0u16).is_err() {
            return String::from(FILLER_BASE);
        }
        let length = formatted.len() * (HEX_PRINT_STEP - 2) + (HEX_PRINT_STEP - 1)
            - FILLER_BASE.len();
        let filler = " ".repeat(length / 2);
        format!("{0}{1}{2}{1}{0}", formatted, filler, FILLER_BASE)
    });

    /// this struct will simulate a single row of opcodes (only in this context)
    struct Row {
        from: usize,
        to: usize,
        data: [Opcode; HEX_PRINT_STEP],
        only_null: bool,
    }

    impl fmt::Display for Row {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut res = String::with_capacity(*super::LENLINE);
            pointer_print::formatter(&mut res, self.from, self.to)?;

            if self.only_null {
                res.push(' ');
                res.push_str(&ZERO_FILLER);
            } else {
                for entry in self.data.iter() {
                    res.push(' ');
                    integer_print::formatter(&mut res, *entry)?;
                }
            }
            write!(f, "{}", res)
        }
    }

    /// will pretty print the content of the raw memory, consecutive rows
    /// of zeros are merged into one
    pub(super) fn printer(memory: &[u8], indent: usize) -> Result<String, fmt::Error> {
        let data_last_index = memory.len().saturating_sub(1);
        let mut rows: Vec<Row> = Vec::with_capacity(memory.len() / POINTER_INCREMENT + 1);

        for from in (0..memory.len()).step_by(POINTER_INCREMENT) {
            // precalculate the end location
            let to = (from + POINTER_INCREMENT - 1).min(data_last_index);

            let mut data = [0; HEX_PRINT_STEP];
            for (slot, index) in data.iter_mut().zip((from..to).step_by(memory::opcodes::SIZE as usize)) {
                *slot = opcode::build_opcode(memory, index).map_err(|_| fmt::Error)?;
            }
            let only_null = data.iter().all(|&opcode| opcode == 0);

            let mut row = Row {
                from,
                to,
                data,
                only_null,
            };

            if only_null {
                if let Some(last_row) = rows.last() {
                    if last_row.only_null {
                        row.from = last_row.from;
                        rows.pop();
                    }
                }
            }
            rows.push(row)
        }

        let mut string = String::with_capacity((*super::LENLINE + 1) * rows.len());
        for row in rows {
            super::indent_helper(&mut string, indent);
            write!(string, "{}{}", row, END_OF_LINE)?;
        }
        if string.ends_with(END_OF_LINE) {
            string.pop();
        }
        Ok(string)
    }
}

/// Prints a single value on its own indented line.
fn single<T>(value: T) -> Result<String, fmt::Error>
where
    T: fmt::UpperHex + num_traits::Unsigned + Copy,
{
    let mut line = String::with_capacity(INDENT_SIZE + *INTEGER_LEN);
    indent_helper(&mut line, INDENT_SIZE);
    integer_print::formatter(&mut line, value)?;
    Ok(line)
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the core first, then the leaf locks one by one
        let core = self.core();
        let (delay, sound) = (self.delay_timer(), self.sound_timer());
        let keyboard = self.keyboard();

        let mut opc = single(core.opcode)?;
        opc.push(' ');
        opc.push_str(&Instruction::decode(core.opcode).to_string());

        let prc = single(core.program_counter)?;
        let idx = single(core.index_register)?;
        let tim = integer_print::printer(&[delay, sound], INDENT_SIZE)?;
        let mem = opcode_print::printer(&core.memory, INDENT_SIZE)?;
        let key = bool_print::printer(keyboard.get_keys(), INDENT_SIZE)?;

        // the stack is filled up with zeros
        let mut stack = [0; cpu::stack::SIZE];
        let live = core.stack.as_slice();
        stack[..live.len()].copy_from_slice(live);
        let sta = integer_print::printer(&stack, INDENT_SIZE)?;
        let dep = single(core.stack.depth() as u8)?;

        let reg = integer_print::printer(&core.registers, INDENT_SIZE)?;

        write!(
            f,
            "Machine {{\n\
                \tOpcode :\n{}\n\
                \tProgram Counter :\n{}\n\
                \tIndex Register :\n{}\n\
                \tTimers (delay, sound) :\n{}\n\
                \tMemory :\n{}\n\
                \tKeyboard :\n{}\n\
                \tStack Pointer :\n{}\n\
                \tStack :\n{}\n\
                \tRegister :\n{}\n\
                }}",
            opc, prc, idx, tim, mem, key, dep, sta, reg
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::get_default_chip;

    #[test]
    /// tests if the pretty print output is as expected
    fn test_full_print() {
        let machine = get_default_chip();
        machine
            .load_program(&[0x60, 0x05, 0x70, 0x01])
            .expect("The program fits into memory.");
        machine.cycle().expect("The first opcode is valid.");
        for key in (1..16).step_by(2) {
            machine.set_key_pressed(key, true);
        }

        let actual = format!("{}", machine);
        let lines: Vec<&str> = actual.split('\n').collect();

        let expected = [
            "Machine {",
            "\tOpcode :",
            "\t\t0x6005 LD V0, 0x05",
            "\tProgram Counter :",
            "\t\t0x0202",
            "\tIndex Register :",
            "\t\t0x0000",
            "\tTimers (delay, sound) :",
            "\t\t0x0000 - 0x0001 : 0x0000 0x0000",
            "\tMemory :",
            "\t\t0x0000 - 0x000F : 0xF090 0x9090 0xF020 0x6020 0x2070 0xF010 0xF080 0xF0F0",
        ];
        for (exp, act) in expected.iter().zip(lines.iter()) {
            assert_eq!(exp, act);
        }

        for line in [
            "\t\t0x0050 - 0x01FF : 0x0000                    ...                    0x0000",
            "\t\t0x0200 - 0x020F : 0x6005 0x7001 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000",
            "\t\t0x0210 - 0x0FFF : 0x0000                    ...                    0x0000",
            "\t\t0x0000 - 0x0007 : false  true   false  true   false  true   false  true",
            "\t\t0x0000 - 0x0007 : 0x0005 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000",
        ] {
            assert!(lines.contains(&line), "missing line {:?} in\n{}", line, actual);
        }
        assert_eq!(lines.last(), Some(&"}"));
    }
}
