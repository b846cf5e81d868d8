use super::models::{
    ChordEvent, LibraryStats, NewAnalysis, NewTrack, SegmentRecord, TensionPointRecord, Track,
    TransitionRecord,
};
use super::{Database, Result};
use rusqlite::params;

impl Database {
    /// Insert or update a track. Returns the track id.
    pub fn upsert_track(&self, t: &NewTrack) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO tracks (
                file_path, file_size, file_modified, format,
                title, artist, album, date, track_number, disc_number,
                set_name, venue, comment,
                parsed_band, parsed_date, parsed_venue, parsed_disc,
                parsed_track, parsed_set, parsed_title, duration_secs,
                updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21,
                datetime('now')
            )
            ON CONFLICT(file_path) DO UPDATE SET
                file_size = excluded.file_size,
                file_modified = excluded.file_modified,
                format = excluded.format,
                title = excluded.title,
                artist = excluded.artist,
                album = excluded.album,
                date = excluded.date,
                track_number = excluded.track_number,
                disc_number = excluded.disc_number,
                set_name = excluded.set_name,
                venue = excluded.venue,
                comment = excluded.comment,
                parsed_band = excluded.parsed_band,
                parsed_date = excluded.parsed_date,
                parsed_venue = excluded.parsed_venue,
                parsed_disc = excluded.parsed_disc,
                parsed_track = excluded.parsed_track,
                parsed_set = excluded.parsed_set,
                parsed_title = excluded.parsed_title,
                duration_secs = excluded.duration_secs,
                updated_at = datetime('now')
            ",
            params![
                t.file_path, t.file_size, t.file_modified, t.format,
                t.title, t.artist, t.album, t.date, t.track_number, t.disc_number,
                t.set_name, t.venue, t.comment,
                t.parsed_band, t.parsed_date, t.parsed_venue, t.parsed_disc,
                t.parsed_track, t.parsed_set, t.parsed_title, t.duration_secs,
            ],
        )?;

        let id: i64 = self.conn.query_row(
            "SELECT id FROM tracks WHERE file_path = ?1",
            params![t.file_path],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Get all tracks that have not been analyzed yet.
    pub fn get_unanalyzed_tracks(&self) -> Result<Vec<Track>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.file_path, t.format, t.artist, t.parsed_band, t.parsed_date
             FROM tracks t
             LEFT JOIN analysis_results a ON a.track_id = t.id
             WHERE a.id IS NULL
             ORDER BY t.id",
        )?;

        let tracks = stmt
            .query_map([], |row| {
                Ok(Track {
                    id: row.get(0)?,
                    file_path: row.get(1)?,
                    format: row.get(2)?,
                    artist: row.get(3)?,
                    parsed_band: row.get(4)?,
                    parsed_date: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tracks)
    }

    /// Get all tracks (for --force re-analysis).
    pub fn get_all_tracks(&self) -> Result<Vec<Track>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_path, format, artist, parsed_band, parsed_date
             FROM tracks ORDER BY id",
        )?;

        let tracks = stmt
            .query_map([], |row| {
                Ok(Track {
                    id: row.get(0)?,
                    file_path: row.get(1)?,
                    format: row.get(2)?,
                    artist: row.get(3)?,
                    parsed_band: row.get(4)?,
                    parsed_date: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tracks)
    }

    /// Store all analysis data for a track in a single transaction.
    /// This includes the main analysis row plus relational detail tables.
    pub fn store_full_analysis(
        &self,
        a: &NewAnalysis,
        chords: &[ChordEvent],
        segments: &[SegmentRecord],
        tension: &[TensionPointRecord],
        transitions: &[TransitionRecord],
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        // Main analysis row
        Self::store_analysis_row(&tx, a)?;

        // Clear old detail rows (for re-analysis)
        tx.execute("DELETE FROM track_chords WHERE track_id = ?1", params![a.track_id])?;
        tx.execute("DELETE FROM track_segments WHERE track_id = ?1", params![a.track_id])?;
        tx.execute("DELETE FROM track_tension_points WHERE track_id = ?1", params![a.track_id])?;
        tx.execute("DELETE FROM track_transitions WHERE track_id = ?1", params![a.track_id])?;

        // Batch insert chords
        if !chords.is_empty() {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO track_chords (track_id, chord, start_time, duration, confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            )?;
            for c in chords {
                stmt.execute(params![c.track_id, c.chord, c.start_time, c.duration, c.confidence])?;
            }
        }

        // Batch insert segments
        if !segments.is_empty() {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO track_segments (
                    track_id, segment_index, label, section_type, start_time, duration,
                    energy, spectral_centroid, zcr, key, tempo, dynamic_range, confidence,
                    harmonic_stability, rhythmic_density, avg_brightness, dynamic_variation
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)"
            )?;
            for s in segments {
                stmt.execute(params![
                    s.track_id, s.segment_index, s.label, s.section_type,
                    s.start_time, s.duration, s.energy, s.spectral_centroid, s.zcr,
                    s.key, s.tempo, s.dynamic_range, s.confidence,
                    s.harmonic_stability, s.rhythmic_density, s.avg_brightness, s.dynamic_variation,
                ])?;
            }
        }

        // Batch insert tension points
        if !tension.is_empty() {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO track_tension_points (track_id, time, tension, change_type)
                 VALUES (?1, ?2, ?3, ?4)"
            )?;
            for t in tension {
                stmt.execute(params![t.track_id, t.time, t.tension, t.change_type])?;
            }
        }

        // Batch insert transitions
        if !transitions.is_empty() {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO track_transitions (track_id, time, transition_type, strength, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            )?;
            for t in transitions {
                stmt.execute(params![t.track_id, t.time, t.transition_type, t.strength, t.duration])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Store the main analysis_results row (used within a transaction).
    fn store_analysis_row(conn: &rusqlite::Connection, a: &NewAnalysis) -> Result<()> {
        conn.execute(
            "INSERT INTO analysis_results (
                track_id,
                duration, sample_rate, channels, peak_amplitude, rms_level, dynamic_range,
                spectral_centroid_mean, spectral_centroid_std, spectral_flux_mean, spectral_flux_std,
                spectral_rolloff_mean, spectral_rolloff_std,
                tempo_bpm, beat_count, onset_count, tempo_stability, rhythmic_complexity,
                mean_pitch, pitch_range_low, pitch_range_high, pitch_stability,
                dominant_pitch, vibrato_presence, vibrato_rate, pitch_confidence_mean,
                lufs_integrated, loudness_range, true_peak_dbfs, crest_factor, energy_level,
                estimated_key, key_confidence, tonality, harmonic_complexity,
                chord_count, chord_change_rate, mode_clarity, key_alternatives_count,
                time_sig_numerator, time_sig_denominator, chroma_vector,
                recording_quality_score, snr_db, clipping_ratio, noise_floor_db,
                segment_count, temporal_complexity, coherence_score,
                energy_shape, peak_energy, energy_variance,
                tension_build_count, tension_release_count,
                repetition_count, repetition_similarity,
                solo_section_count, solo_section_ratio, transition_count,
                classification_music_score, hnr,
                energy_score, intensity_score, groove_score,
                improvisation_score, tightness_score, build_quality_score,
                exploratory_score, transcendence_score,
                analyzed_at
            ) VALUES (
                ?1,
                ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13,
                ?14, ?15, ?16, ?17, ?18,
                ?19, ?20, ?21, ?22,
                ?23, ?24, ?25, ?26,
                ?27, ?28, ?29, ?30, ?31,
                ?32, ?33, ?34, ?35,
                ?36, ?37, ?38, ?39,
                ?40, ?41, ?42,
                ?43, ?44, ?45, ?46,
                ?47, ?48, ?49,
                ?50, ?51, ?52,
                ?53, ?54,
                ?55, ?56,
                ?57, ?58, ?59,
                ?60, ?61,
                ?62, ?63, ?64,
                ?65, ?66, ?67,
                ?68, ?69,
                datetime('now')
            )
            ON CONFLICT(track_id) DO UPDATE SET
                duration = excluded.duration,
                sample_rate = excluded.sample_rate,
                channels = excluded.channels,
                peak_amplitude = excluded.peak_amplitude,
                rms_level = excluded.rms_level,
                dynamic_range = excluded.dynamic_range,
                spectral_centroid_mean = excluded.spectral_centroid_mean,
                spectral_centroid_std = excluded.spectral_centroid_std,
                spectral_flux_mean = excluded.spectral_flux_mean,
                spectral_flux_std = excluded.spectral_flux_std,
                spectral_rolloff_mean = excluded.spectral_rolloff_mean,
                spectral_rolloff_std = excluded.spectral_rolloff_std,
                tempo_bpm = excluded.tempo_bpm,
                beat_count = excluded.beat_count,
                onset_count = excluded.onset_count,
                tempo_stability = excluded.tempo_stability,
                rhythmic_complexity = excluded.rhythmic_complexity,
                mean_pitch = excluded.mean_pitch,
                pitch_range_low = excluded.pitch_range_low,
                pitch_range_high = excluded.pitch_range_high,
                pitch_stability = excluded.pitch_stability,
                dominant_pitch = excluded.dominant_pitch,
                vibrato_presence = excluded.vibrato_presence,
                vibrato_rate = excluded.vibrato_rate,
                pitch_confidence_mean = excluded.pitch_confidence_mean,
                lufs_integrated = excluded.lufs_integrated,
                loudness_range = excluded.loudness_range,
                true_peak_dbfs = excluded.true_peak_dbfs,
                crest_factor = excluded.crest_factor,
                energy_level = excluded.energy_level,
                estimated_key = excluded.estimated_key,
                key_confidence = excluded.key_confidence,
                tonality = excluded.tonality,
                harmonic_complexity = excluded.harmonic_complexity,
                chord_count = excluded.chord_count,
                chord_change_rate = excluded.chord_change_rate,
                mode_clarity = excluded.mode_clarity,
                key_alternatives_count = excluded.key_alternatives_count,
                time_sig_numerator = excluded.time_sig_numerator,
                time_sig_denominator = excluded.time_sig_denominator,
                chroma_vector = excluded.chroma_vector,
                recording_quality_score = excluded.recording_quality_score,
                snr_db = excluded.snr_db,
                clipping_ratio = excluded.clipping_ratio,
                noise_floor_db = excluded.noise_floor_db,
                segment_count = excluded.segment_count,
                temporal_complexity = excluded.temporal_complexity,
                coherence_score = excluded.coherence_score,
                energy_shape = excluded.energy_shape,
                peak_energy = excluded.peak_energy,
                energy_variance = excluded.energy_variance,
                tension_build_count = excluded.tension_build_count,
                tension_release_count = excluded.tension_release_count,
                repetition_count = excluded.repetition_count,
                repetition_similarity = excluded.repetition_similarity,
                solo_section_count = excluded.solo_section_count,
                solo_section_ratio = excluded.solo_section_ratio,
                transition_count = excluded.transition_count,
                classification_music_score = excluded.classification_music_score,
                hnr = excluded.hnr,
                energy_score = excluded.energy_score,
                intensity_score = excluded.intensity_score,
                groove_score = excluded.groove_score,
                improvisation_score = excluded.improvisation_score,
                tightness_score = excluded.tightness_score,
                build_quality_score = excluded.build_quality_score,
                exploratory_score = excluded.exploratory_score,
                transcendence_score = excluded.transcendence_score,
                analyzed_at = datetime('now')
            ",
            params![
                a.track_id,
                a.duration, a.sample_rate, a.channels, a.peak_amplitude, a.rms_level, a.dynamic_range,
                a.spectral_centroid_mean, a.spectral_centroid_std, a.spectral_flux_mean, a.spectral_flux_std,
                a.spectral_rolloff_mean, a.spectral_rolloff_std,
                a.tempo_bpm, a.beat_count, a.onset_count, a.tempo_stability, a.rhythmic_complexity,
                a.mean_pitch, a.pitch_range_low, a.pitch_range_high, a.pitch_stability,
                a.dominant_pitch, a.vibrato_presence, a.vibrato_rate, a.pitch_confidence_mean,
                a.lufs_integrated, a.loudness_range, a.true_peak_dbfs, a.crest_factor, a.energy_level,
                a.estimated_key, a.key_confidence, a.tonality, a.harmonic_complexity,
                a.chord_count, a.chord_change_rate, a.mode_clarity, a.key_alternatives_count,
                a.time_sig_numerator, a.time_sig_denominator, a.chroma_vector,
                a.recording_quality_score, a.snr_db, a.clipping_ratio, a.noise_floor_db,
                a.segment_count, a.temporal_complexity, a.coherence_score,
                a.energy_shape, a.peak_energy, a.energy_variance,
                a.tension_build_count, a.tension_release_count,
                a.repetition_count, a.repetition_similarity,
                a.solo_section_count, a.solo_section_ratio, a.transition_count,
                a.classification_music_score, a.hnr,
                a.energy_score, a.intensity_score, a.groove_score,
                a.improvisation_score, a.tightness_score, a.build_quality_score,
                a.exploratory_score, a.transcendence_score,
            ],
        )?;
        Ok(())
    }

    /// Backward-compatible: store just the analysis row without detail tables.
    pub fn store_analysis(&self, a: &NewAnalysis) -> Result<()> {
        Self::store_analysis_row(&self.conn, a)
    }

    /// Get library statistics.
    pub fn stats(&self) -> Result<LibraryStats> {
        let total_tracks: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tracks",
            [],
            |row| row.get(0),
        )?;

        let analyzed_tracks: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM analysis_results",
            [],
            |row| row.get(0),
        )?;

        let total_duration_hours: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(duration), 0.0) / 3600.0 FROM analysis_results",
            [],
            |row| row.get(0),
        )?;

        let mut fmt_stmt = self.conn.prepare(
            "SELECT format, COUNT(*) FROM tracks GROUP BY format ORDER BY COUNT(*) DESC",
        )?;
        let formats: Vec<(String, i64)> = fmt_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut band_stmt = self.conn.prepare(
            "SELECT COALESCE(parsed_band, artist, 'Unknown'), COUNT(*)
             FROM tracks
             GROUP BY COALESCE(parsed_band, artist, 'Unknown')
             ORDER BY COUNT(*) DESC
             LIMIT 20",
        )?;
        let bands: Vec<(String, i64)> = band_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(LibraryStats {
            total_tracks,
            analyzed_tracks,
            total_duration_hours,
            formats,
            bands,
        })
    }

    /// Check if a file path already exists and hasn't changed (same size+mtime).
    pub fn track_unchanged(&self, file_path: &str, file_size: i64, file_modified: &str) -> Result<bool> {
        let result: std::result::Result<(i64, String), _> = self.conn.query_row(
            "SELECT file_size, file_modified FROM tracks WHERE file_path = ?1",
            params![file_path],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );

        match result {
            Ok((size, mtime)) => Ok(size == file_size && mtime == file_modified),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
