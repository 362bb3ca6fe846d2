// Text formatting demos
// Greeting, coordinates and a dot-filled population table

/// Population by county, in display order
pub const POPULATION: [(&str, u64); 4] = [
    ("Hennepin", 1_293_582),
    ("Ramsey", 549_097),
    ("Traverse", 3_052),
    ("Lake of the Woods", 3_783),
];

pub fn greeting(name: &str) -> String {
    format!("Hello, {name}!")
}

pub fn location(lat: f64, lon: f64) -> String {
    format!("Your location is ({lat}, {lon})")
}

/// UTM position with easting and northing rounded to whole metres,
/// halves to even
pub fn utm_location(grid: &str, easting: f64, northing: f64) -> String {
    format!(
        "Your location is {grid} {}m E  {}m N",
        group_thousands(easting.round_ties_even() as i64),
        group_thousands(northing.round_ties_even() as i64)
    )
}

/// County padded with dots to 18 columns, population right-aligned in 10
pub fn population_line(county: &str, population: u64) -> String {
    let population = group_thousands(population as i64);
    format!("{county:.<18}{population:.>10}")
}

pub fn population_table() -> Vec<String> {
    POPULATION
        .iter()
        .map(|(county, population)| population_line(county, *population))
        .collect()
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    if n < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting() {
        assert_eq!(greeting("World"), "Hello, World!");
    }

    #[test]
    fn test_location_keeps_full_precision() {
        assert_eq!(
            location(45.9711247890, -91.44125437908),
            "Your location is (45.971124789, -91.44125437908)"
        );
    }

    #[test]
    fn test_utm_location() {
        assert_eq!(
            utm_location("15N", 491993.112, 4977445.948),
            "Your location is 15N 491,993m E  4,977,446m N"
        );
    }

    #[test]
    fn test_utm_rounds_halves_to_even() {
        assert_eq!(
            utm_location("15N", 2.5, 3.5),
            "Your location is 15N 2m E  4m N"
        );
        assert_eq!(
            utm_location("15N", 1_000_000.5, 0.5),
            "Your location is 15N 1,000,000m E  0m N"
        );
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(-1_293_582), "-1,293,582");
    }

    #[test]
    fn test_population_table() {
        assert_eq!(
            population_table(),
            vec![
                "Hennepin...........1,293,582",
                "Ramsey...............549,097",
                "Traverse...............3,052",
                "Lake of the Woods......3,783",
            ]
        );
    }
}
