//! The `sumrise validate` command.

use anyhow::Result;

use sumrise_core::validation::validate_answer;

pub fn execute(answers: Vec<String>) -> Result<()> {
    let mut rejected = 0;

    for raw in &answers {
        match validate_answer(raw) {
            Ok(value) => println!("  OK       {value:?}"),
            Err(e) => {
                println!("  REJECTED {raw:?}: {e}");
                rejected += 1;
            }
        }
    }

    if rejected == 0 {
        println!("All answers valid.");
        Ok(())
    } else {
        anyhow::bail!("{rejected} answer(s) rejected")
    }
}
