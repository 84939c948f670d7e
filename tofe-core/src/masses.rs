//! Embedded nuclide table: isotope masses and natural abundances.
//!
//! Masses are in atomic mass units (u), abundances in percent. The table
//! covers the elements that occur in recoil spectrometry work: light
//! target constituents, common beam ions and heavy substrates.

/// A single isotope entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsotopeRecord {
    /// Mass number (protons + neutrons).
    pub mass_number: u32,
    /// Isotope mass in atomic mass units.
    pub mass_amu: f64,
    /// Natural abundance in percent. Zero for isotopes with no natural
    /// occurrence that still show up as beam species (e.g. tritium).
    pub abundance: f64,
}

/// Per-element entry of the embedded table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementRecord {
    /// Chemical symbol, e.g. `"He"`.
    pub symbol: &'static str,
    /// Standard atomic mass in atomic mass units.
    pub standard_mass: f64,
    /// Naturally occurring (plus a few beam-relevant) isotopes.
    pub isotopes: &'static [IsotopeRecord],
}

const fn iso(mass_number: u32, mass_amu: f64, abundance: f64) -> IsotopeRecord {
    IsotopeRecord {
        mass_number,
        mass_amu,
        abundance,
    }
}

static TABLE: &[ElementRecord] = &[
    ElementRecord {
        symbol: "H",
        standard_mass: 1.008,
        isotopes: &[
            iso(1, 1.007_825_032, 99.9885),
            iso(2, 2.014_101_778, 0.0115),
            iso(3, 3.016_049_278, 0.0),
        ],
    },
    ElementRecord {
        symbol: "He",
        standard_mass: 4.002_602,
        isotopes: &[iso(3, 3.016_029_319, 0.000_134), iso(4, 4.002_603_254, 99.999_866)],
    },
    ElementRecord {
        symbol: "Li",
        standard_mass: 6.94,
        isotopes: &[iso(6, 6.015_122_887, 7.59), iso(7, 7.016_003_437, 92.41)],
    },
    ElementRecord {
        symbol: "Be",
        standard_mass: 9.012_183,
        isotopes: &[iso(9, 9.012_183_07, 100.0)],
    },
    ElementRecord {
        symbol: "B",
        standard_mass: 10.81,
        isotopes: &[iso(10, 10.012_936_95, 19.9), iso(11, 11.009_305_36, 80.1)],
    },
    ElementRecord {
        symbol: "C",
        standard_mass: 12.011,
        isotopes: &[iso(12, 12.0, 98.93), iso(13, 13.003_354_835, 1.07)],
    },
    ElementRecord {
        symbol: "N",
        standard_mass: 14.007,
        isotopes: &[iso(14, 14.003_074_004, 99.636), iso(15, 15.000_108_899, 0.364)],
    },
    ElementRecord {
        symbol: "O",
        standard_mass: 15.999,
        isotopes: &[
            iso(16, 15.994_914_620, 99.757),
            iso(17, 16.999_131_757, 0.038),
            iso(18, 17.999_159_613, 0.205),
        ],
    },
    ElementRecord {
        symbol: "F",
        standard_mass: 18.998_403,
        isotopes: &[iso(19, 18.998_403_163, 100.0)],
    },
    ElementRecord {
        symbol: "Ne",
        standard_mass: 20.1797,
        isotopes: &[
            iso(20, 19.992_440_176, 90.48),
            iso(21, 20.993_846_685, 0.27),
            iso(22, 21.991_385_114, 9.25),
        ],
    },
    ElementRecord {
        symbol: "Na",
        standard_mass: 22.989_769,
        isotopes: &[iso(23, 22.989_769_282, 100.0)],
    },
    ElementRecord {
        symbol: "Mg",
        standard_mass: 24.305,
        isotopes: &[
            iso(24, 23.985_041_697, 78.99),
            iso(25, 24.985_836_976, 10.00),
            iso(26, 25.982_592_968, 11.01),
        ],
    },
    ElementRecord {
        symbol: "Al",
        standard_mass: 26.981_538,
        isotopes: &[iso(27, 26.981_538_53, 100.0)],
    },
    ElementRecord {
        symbol: "Si",
        standard_mass: 28.085,
        isotopes: &[
            iso(28, 27.976_926_535, 92.223),
            iso(29, 28.976_494_665, 4.685),
            iso(30, 29.973_770_136, 3.092),
        ],
    },
    ElementRecord {
        symbol: "P",
        standard_mass: 30.973_762,
        isotopes: &[iso(31, 30.973_761_998, 100.0)],
    },
    ElementRecord {
        symbol: "S",
        standard_mass: 32.06,
        isotopes: &[
            iso(32, 31.972_071_174, 94.99),
            iso(33, 32.971_458_910, 0.75),
            iso(34, 33.967_867_004, 4.25),
            iso(36, 35.967_080_71, 0.01),
        ],
    },
    ElementRecord {
        symbol: "Cl",
        standard_mass: 35.45,
        isotopes: &[iso(35, 34.968_852_682, 75.76), iso(37, 36.965_902_602, 24.24)],
    },
    ElementRecord {
        symbol: "Ar",
        standard_mass: 39.948,
        isotopes: &[
            iso(36, 35.967_545_105, 0.3336),
            iso(38, 37.962_732_11, 0.0629),
            iso(40, 39.962_383_124, 99.6035),
        ],
    },
    ElementRecord {
        symbol: "K",
        standard_mass: 39.0983,
        isotopes: &[
            iso(39, 38.963_706_486, 93.2581),
            iso(40, 39.963_998_166, 0.0117),
            iso(41, 40.961_825_257, 6.7302),
        ],
    },
    ElementRecord {
        symbol: "Ca",
        standard_mass: 40.078,
        isotopes: &[
            iso(40, 39.962_590_863, 96.941),
            iso(42, 41.958_617_83, 0.647),
            iso(43, 42.958_766_44, 0.135),
            iso(44, 43.955_481_56, 2.086),
            iso(48, 47.952_522_76, 0.187),
        ],
    },
    ElementRecord {
        symbol: "Ti",
        standard_mass: 47.867,
        isotopes: &[
            iso(46, 45.952_627_72, 8.25),
            iso(47, 46.951_758_79, 7.44),
            iso(48, 47.947_941_98, 73.72),
            iso(49, 48.947_865_68, 5.41),
            iso(50, 49.944_786_89, 5.18),
        ],
    },
    ElementRecord {
        symbol: "Cr",
        standard_mass: 51.9961,
        isotopes: &[
            iso(50, 49.946_041_83, 4.345),
            iso(52, 51.940_506_23, 83.789),
            iso(53, 52.940_648_15, 9.501),
            iso(54, 53.938_879_16, 2.365),
        ],
    },
    ElementRecord {
        symbol: "Fe",
        standard_mass: 55.845,
        isotopes: &[
            iso(54, 53.939_608_99, 5.845),
            iso(56, 55.934_936_33, 91.754),
            iso(57, 56.935_392_84, 2.119),
            iso(58, 57.933_274_43, 0.282),
        ],
    },
    ElementRecord {
        symbol: "Ni",
        standard_mass: 58.6934,
        isotopes: &[
            iso(58, 57.935_342_41, 68.0769),
            iso(60, 59.930_785_88, 26.2231),
            iso(61, 60.931_055_57, 1.1399),
            iso(62, 61.928_345_37, 3.6345),
            iso(64, 63.927_966_82, 0.9256),
        ],
    },
    ElementRecord {
        symbol: "Cu",
        standard_mass: 63.546,
        isotopes: &[iso(63, 62.929_597_72, 69.15), iso(65, 64.927_789_70, 30.85)],
    },
    ElementRecord {
        symbol: "Ge",
        standard_mass: 72.630,
        isotopes: &[
            iso(70, 69.924_248_75, 20.57),
            iso(72, 71.922_075_82, 27.45),
            iso(73, 72.923_458_96, 7.75),
            iso(74, 73.921_177_76, 36.50),
            iso(76, 75.921_402_73, 7.73),
        ],
    },
    ElementRecord {
        symbol: "Zr",
        standard_mass: 91.224,
        isotopes: &[
            iso(90, 89.904_697_7, 51.45),
            iso(91, 90.905_639_6, 11.22),
            iso(92, 91.905_034_7, 17.15),
            iso(94, 93.906_310_8, 17.38),
            iso(96, 95.908_271_4, 2.80),
        ],
    },
    ElementRecord {
        symbol: "Ag",
        standard_mass: 107.8682,
        isotopes: &[iso(107, 106.905_091_6, 51.839), iso(109, 108.904_755_3, 48.161)],
    },
    ElementRecord {
        symbol: "I",
        standard_mass: 126.904_47,
        isotopes: &[iso(127, 126.904_471_9, 100.0)],
    },
    ElementRecord {
        symbol: "Ta",
        standard_mass: 180.947_88,
        isotopes: &[iso(180, 179.947_464_8, 0.012), iso(181, 180.947_995_8, 99.988)],
    },
    ElementRecord {
        symbol: "W",
        standard_mass: 183.84,
        isotopes: &[
            iso(180, 179.946_710_8, 0.12),
            iso(182, 181.948_203_9, 26.50),
            iso(183, 182.950_222_8, 14.31),
            iso(184, 183.950_930_9, 30.64),
            iso(186, 185.954_362_8, 28.43),
        ],
    },
    ElementRecord {
        symbol: "Au",
        standard_mass: 196.966_570,
        isotopes: &[iso(197, 196.966_568_8, 100.0)],
    },
    ElementRecord {
        symbol: "Pb",
        standard_mass: 207.2,
        isotopes: &[
            iso(204, 203.973_044_0, 1.4),
            iso(206, 205.974_465_7, 24.1),
            iso(207, 206.975_897_3, 22.1),
            iso(208, 207.976_652_5, 52.4),
        ],
    },
    ElementRecord {
        symbol: "Bi",
        standard_mass: 208.980_40,
        isotopes: &[iso(209, 208.980_399_1, 100.0)],
    },
];

/// Looks up the table entry for a chemical symbol.
#[must_use]
pub fn element_record(symbol: &str) -> Option<&'static ElementRecord> {
    TABLE.iter().find(|r| r.symbol == symbol)
}

/// Returns the standard atomic mass for a symbol, in atomic mass units.
#[must_use]
pub fn standard_mass(symbol: &str) -> Option<f64> {
    element_record(symbol).map(|r| r.standard_mass)
}

/// Returns the mass of a specific isotope, in atomic mass units.
#[must_use]
pub fn isotope_mass(symbol: &str, mass_number: u32) -> Option<f64> {
    element_record(symbol)?
        .isotopes
        .iter()
        .find(|i| i.mass_number == mass_number)
        .map(|i| i.mass_amu)
}

/// Returns the naturally most abundant isotope of a symbol.
#[must_use]
pub fn most_common_isotope(symbol: &str) -> Option<&'static IsotopeRecord> {
    element_record(symbol)?
        .isotopes
        .iter()
        .max_by(|a, b| a.abundance.total_cmp(&b.abundance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn helium_four_mass() {
        assert_relative_eq!(isotope_mass("He", 4).unwrap(), 4.002_603_254, epsilon = 1e-9);
    }

    #[test]
    fn most_common_silicon_isotope_is_28() {
        assert_eq!(most_common_isotope("Si").unwrap().mass_number, 28);
    }

    #[test]
    fn unknown_symbol_is_none() {
        assert!(element_record("Xx").is_none());
        assert!(standard_mass("Q").is_none());
        assert!(isotope_mass("He", 5).is_none());
    }
}
