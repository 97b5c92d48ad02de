//! Benchmark for live membership evaluation over a large contact set.
//! Run with: cargo bench -p audience-segmentation

use std::collections::BTreeSet;

use audience_core::types::{Audience, AudienceMode, Contact};
use audience_segmentation::{compute_membership, CriteriaBuilder};

const PROPERTY_TYPES: [&str; 4] = ["House", "Condo", "Villa", "Plot"];
const LOCATIONS: [&str; 5] = ["Pune", "Mumbai", "Goa", "Nashik", "Thane"];

fn create_contacts(n: usize) -> Vec<Contact> {
    (0..n)
        .map(|i| Contact {
            property_type: Some(PROPERTY_TYPES[i % PROPERTY_TYPES.len()].to_string()),
            bedrooms: Some((i % 5) as u32 + 1),
            bathrooms: Some((i % 3) as u32 + 1),
            budget_min: Some((i % 50) as f64 * 100_000.0),
            budget_max: Some((i % 50) as f64 * 100_000.0 + 2_500_000.0),
            square_feet: Some(500.0 + (i % 40) as f64 * 100.0),
            preferred_location: Some(LOCATIONS[i % LOCATIONS.len()].to_string()),
            custom_tags: if i % 7 == 0 {
                BTreeSet::from(["VIP".to_string()])
            } else {
                BTreeSet::new()
            },
            notes: Some(format!("lead {} wants a garden", i)),
            is_active: i % 11 != 0,
            ..Contact::new(format!("c-{:06}", i), format!("c{}@example.com", i))
        })
        .collect()
}

fn main() {
    let contacts = create_contacts(50_000);
    let criteria = CriteriaBuilder::new()
        .property_types(["House", "Villa"])
        .bedrooms([3, 4])
        .budget_min(1_500_000.0)
        .locations(["Pune", "Goa"])
        .notes_search("GARDEN")
        .build();
    let audience = Audience {
        id: "bench".to_string(),
        name: "Bench".to_string(),
        description: None,
        mode: AudienceMode::Filtered { criteria },
        contact_count: 0,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };

    // Warmup
    for _ in 0..3 {
        std::hint::black_box(compute_membership(&audience, &contacts));
    }

    // Benchmark
    let iterations = 100;
    let start = std::time::Instant::now();
    let mut members = 0;
    for _ in 0..iterations {
        members = std::hint::black_box(compute_membership(&audience, &contacts)).len();
    }

    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations;

    println!("=== Membership Benchmark ===");
    println!("Iterations:  {}", iterations);
    println!("Contacts:    {}", contacts.len());
    println!("Members:     {}", members);
    println!("Total time:  {:?}", elapsed);
    println!("Per scan:    {:?}", per_iter);
    println!(
        "Throughput:  {:.0} contacts/sec",
        (contacts.len() as f64 * iterations as f64) / elapsed.as_secs_f64()
    );
}
