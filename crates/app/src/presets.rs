use automaton_core::{CatalogConfig, Rhythm, RhythmBank, Result};

/// Built-in rhythms together with the names used on the command line.
pub struct Catalog {
    pub bank: RhythmBank,
    pub names: Vec<&'static str>,
}

pub fn catalog(config: &CatalogConfig) -> Result<Catalog> {
    let mut bank = RhythmBank::with_capacity(config.max_rhythms);
    let mut names = Vec::new();

    let builders: [(&'static str, fn(&mut Rhythm) -> Result<()>); 4] = [
        ("descending peal", descending_peal),
        ("low toll", low_toll),
        ("woodpecker roll", woodpecker_roll),
        ("call and answer", call_and_answer),
    ];

    for (name, build) in builders {
        let mut rhythm = Rhythm::with_capacity(config.max_notes);
        build(&mut rhythm)?;
        bank.add_rhythm(rhythm.into_handle())?;
        names.push(name);
    }

    Ok(Catalog { bank, names })
}

fn descending_peal(rhythm: &mut Rhythm) -> Result<()> {
    rhythm.add_note(880.0, 400, 0, 0.9)?;
    rhythm.add_note(660.0, 400, 250, 0.8)?;
    rhythm.add_note(440.0, 600, 250, 0.8)?;
    rhythm.add_note(330.0, 900, 500, 1.0)?;
    Ok(())
}

fn low_toll(rhythm: &mut Rhythm) -> Result<()> {
    rhythm.add_note(220.0, 1200, 0, 1.0)?;
    rhythm.add_dampened_note(220.0, 800, 0.6)?;
    rhythm.add_note(220.0, 1200, 800, 1.0)?;
    Ok(())
}

fn woodpecker_roll(rhythm: &mut Rhythm) -> Result<()> {
    rhythm.add_strike(0, 0.4)?;
    for _ in 0..5 {
        rhythm.add_strike(60, 0.6)?;
    }
    rhythm.add_strike(180, 1.0)?;
    rhythm.add_motor_move(0, 500, 300)?;
    Ok(())
}

fn call_and_answer(rhythm: &mut Rhythm) -> Result<()> {
    rhythm.add_note(440.0, 300, 0, 0.7)?;
    rhythm.add_note(550.0, 300, 200, 0.7)?;
    rhythm.add_strike(300, 0.9)?;
    rhythm.add_strike(120, 0.5)?;
    rhythm.add_dampened_note(660.0, 300, 0.8)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_fit_default_capacities() {
        let catalog = catalog(&CatalogConfig::default()).unwrap();
        assert_eq!(catalog.bank.len(), catalog.names.len());

        for rhythm in catalog.bank.iter() {
            let rhythm = rhythm.borrow();
            assert!(!rhythm.is_empty());
            assert_eq!(rhythm.note(0).unwrap().onset, 0);
        }
    }

    #[test]
    fn small_catalog_is_refused() {
        let config = CatalogConfig {
            max_rhythms: 2,
            ..CatalogConfig::default()
        };
        assert!(catalog(&config).is_err());
    }
}
