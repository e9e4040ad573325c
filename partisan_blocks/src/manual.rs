/*!

This is the long-form manual for `partisan_blocks` and `mapblue`.

## The model

Each census block comes with its population over voting age (`over18`) and
five head counts: black, hispanic, other races, unmarried and childless
people. The counts are divided by `over18` and combined linearly:

```text
demShare = constant
         + black     * black / over18
         + hispanic  * hispanic / over18
         + otherRace * otherRace / over18
         + unmarried * unmarried / over18
         + childless * childless / over18
```

The default weights are:

| coefficient | value     |
|-------------|-----------|
| black       | 0.4501479 |
| hispanic    | 0.077551  |
| otherRace   | 0.1358834 |
| unmarried   | 0.0911239 |
| childless   | 0.115441  |
| constant    | 0.3638054 |

From the share, `demVotes = over18 * demShare`, `repVotes = over18 - demVotes`
and `netVotes = demVotes - repVotes`. A block with no voting-age population
has all its statistics set to zero.

The share is not clamped. With unusual weights, or with overlapping head
counts, it may fall below zero or above one. The styling takes care of
keeping the opacity within bounds.

## Session

A session starts empty. Every time the map moves, the blocks inside the new
viewport are requested from the lookup service. Blocks that were already
loaded are ignored, so that overlapping viewports never count a block twice.
The session keeps:
* the total number of voters, and the estimated votes for each party
* the largest estimated vote count of a single block, for each party
* the net votes of the selected blocks

Clicking a block adds its net votes to the selection, clicking it again
removes them. Changing the coefficients recomputes every block and all the
totals from scratch, keeping the selection.

## Configuration

`mapblue` reads an optional session file in JSON format (`--config`):

```json
{
  "lookup": { "url": "http://mapblue.org/lookup" },
  "geocoder": { "url": "https://nominatim.openstreetmap.org/search", "latSpan": 0.01, "lonSpan": 0.02 },
  "coefficients": { "black": 0.45, "hispanic": 0.08, "otherRace": 0.14,
                    "unmarried": 0.09, "childless": 0.12, "constant": 0.36 },
  "style": { "opacityMode": "count", "minOpacity": 0.15 },
  "steps": [
    { "action": "viewport", "lat1": 39.772, "lon1": -86.155, "lat2": 39.765, "lon2": -86.170 },
    { "action": "click", "id": "181570003001000" },
    { "action": "hover", "id": "181570003001000" },
    { "action": "coefficients", "constant": 0.30 },
    { "action": "geocode", "address": "200 W Washington St, Indianapolis" },
    { "action": "reload" }
  ]
}
```

All the entries are optional. The command line flags take precedence over
the content of the file.

## Lookup service

The lookup service answers `GET <url>?lat1=..&lon1=..&lat2=..&lon2=..` with a
GeoJSON `FeatureCollection`. Each feature carries an `id` (string or number)
and the properties `over18`, `black`, `hispanic`, `otherRace`, `unmarried`,
`childless` and optionally `name`. An empty object `{}` means that there is
no block in the viewport.

## Output

The styled blocks are written as a GeoJSON `FeatureCollection` (`--out`),
each feature carrying its statistics and a `style` object. The totals of
the session are written as a JSON summary (`--summary`), which can be
checked against a reference file (`--reference`).

*/
