//! Agronomist prompt template.

use crate::features::FeatureVector;

/// Prompt asking for the five advice sections for `crop` under `vector`
pub fn build_prompt(crop: &str, vector: &FeatureVector, location: Option<&str>) -> String {
    let location_text = location
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!(" in {}", l))
        .unwrap_or_default();

    format!(
        "You are an expert agricultural advisor helping farmers grow {crop}{location_text}.

**Soil Conditions:**
- Nitrogen (N): {n} kg/ha
- Phosphorus (P): {p} kg/ha
- Potassium (K): {k} kg/ha
- pH Level: {ph}

**Climate Conditions:**
- Temperature: {temperature}°C
- Humidity: {humidity}%
- Rainfall: {rainfall} mm

Please provide practical, farmer-friendly advice covering:

1. **Suitability Assessment**: Is this crop suitable for these conditions? (2-3 sentences)

2. **Best Sowing Season**: When to plant for optimal yield (1-2 sentences)

3. **Fertilizer Recommendations**: Specific NPK adjustments needed (2-3 sentences)

4. **Disease & Pest Risks**: Common issues to watch for (2-3 sentences)

5. **Yield Optimization Tips**: 3-4 actionable tips to maximize harvest

Keep language simple and practical. Avoid overly technical jargon. Focus on actionable advice.",
        n = vector.nitrogen,
        p = vector.phosphorus,
        k = vector.potassium,
        ph = vector.ph,
        temperature = vector.temperature,
        humidity = vector.humidity,
        rainfall = vector.rainfall,
    )
}
